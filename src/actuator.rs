//! 执行器控制 (Actuator Controller)
//!
//! 调度主线程独占, 连接在所有退出路径上都会被释放 (包括panic和Ctrl+C)

use anyhow::{bail, Context, Result};
use std::fs::{File, OpenOptions};
use std::io::Write;

/// 执行器接口
pub trait Actuator {
    /// 推动一次指定通道 (发出即返回)
    fn activate(&mut self, channel: u8) -> Result<()>;

    /// 释放连接
    fn close(&mut self) -> Result<()>;
}

/// 工厂执行器控制器
///
/// 指定端口时每次推动写一行 `PUSH <channel>`; 未指定端口时只打印 (演示模式)
pub struct FactoryController {
    port: Option<(String, File)>,
    pulses: u64,
}

impl FactoryController {
    pub fn open(port: Option<&str>) -> Result<Self> {
        let port = match port {
            Some(path) => {
                let file = OpenOptions::new()
                    .write(true)
                    .open(path)
                    .with_context(|| format!("无法打开执行器端口: {}", path))?;
                log::info!("🔌 执行器已连接: {}", path);
                Some((path.to_string(), file))
            }
            None => {
                log::info!("🔌 未指定执行器端口, 演示模式 (只打印不驱动硬件)");
                None
            }
        };
        Ok(Self { port, pulses: 0 })
    }

    pub fn pulses(&self) -> u64 {
        self.pulses
    }
}

impl Actuator for FactoryController {
    fn activate(&mut self, channel: u8) -> Result<()> {
        self.pulses += 1;
        match &mut self.port {
            Some((path, file)) => {
                writeln!(file, "PUSH {}", channel)
                    .and_then(|_| file.flush())
                    .with_context(|| format!("执行器写入失败: {}", path))?;
                log::info!("🦾 推动执行器 {}", channel);
            }
            None => log::info!("🦾 [演示] 推动执行器 {}", channel),
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some((path, mut file)) = self.port.take() {
            file.flush()
                .with_context(|| format!("执行器关闭失败: {}", path))?;
            log::info!("🔌 执行器已断开: {} (共推动 {} 次)", path, self.pulses);
        }
        Ok(())
    }
}

/// 执行器守卫: close只生效一次, Drop时自动关闭
pub struct ActuatorGuard<A: Actuator> {
    inner: Option<A>,
}

impl<A: Actuator> ActuatorGuard<A> {
    pub fn new(actuator: A) -> Self {
        Self {
            inner: Some(actuator),
        }
    }

    pub fn activate(&mut self, channel: u8) -> Result<()> {
        match &mut self.inner {
            Some(actuator) => actuator.activate(channel),
            None => bail!("执行器已关闭, 忽略通道 {}", channel),
        }
    }

    /// 关闭连接, 返回本次调用是否真正执行了关闭
    pub fn close(&mut self) -> Result<bool> {
        match self.inner.take() {
            Some(mut actuator) => {
                actuator.close()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl<A: Actuator> Drop for ActuatorGuard<A> {
    fn drop(&mut self) {
        if let Some(mut actuator) = self.inner.take() {
            log::warn!("⚠️  执行器未正常关闭, 自动释放");
            if let Err(e) = actuator.close() {
                log::error!("❌ {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::RecordingActuator;

    #[test]
    fn test_guard_closes_once() {
        let actuator = RecordingActuator::default();
        let log = actuator.log.clone();
        let mut guard = ActuatorGuard::new(actuator);

        guard.activate(1).unwrap();
        assert!(guard.close().unwrap());
        assert!(!guard.close().unwrap());
        assert!(guard.activate(2).is_err());
        drop(guard);

        let log = log.lock().unwrap();
        assert_eq!(log.activated, vec![1]);
        assert_eq!(log.closed, 1);
    }

    #[test]
    fn test_guard_closes_on_drop() {
        let actuator = RecordingActuator::default();
        let log = actuator.log.clone();
        {
            let mut guard = ActuatorGuard::new(actuator);
            guard.activate(2).unwrap();
        }
        assert_eq!(log.lock().unwrap().closed, 1);
    }

    #[test]
    fn test_guard_closes_on_panic() {
        let actuator = RecordingActuator::default();
        let log = actuator.log.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _guard = ActuatorGuard::new(actuator);
            panic!("dispatch loop failed");
        }));
        assert!(result.is_err());
        assert_eq!(log.lock().unwrap().closed, 1);
    }

    #[test]
    fn test_controller_writes_commands() {
        let path = std::env::temp_dir().join(format!("smart-factory-port-{}", std::process::id()));
        File::create(&path).unwrap();

        let mut ctrl = FactoryController::open(Some(path.to_str().unwrap())).unwrap();
        ctrl.activate(1).unwrap();
        ctrl.activate(2).unwrap();
        ctrl.close().unwrap();
        ctrl.close().unwrap();

        assert_eq!(ctrl.pulses(), 2);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "PUSH 1\nPUSH 2\n");
    }

    #[test]
    fn test_controller_dry_run() {
        let mut ctrl = FactoryController::open(None).unwrap();
        ctrl.activate(1).unwrap();
        ctrl.close().unwrap();
        assert_eq!(ctrl.pulses(), 1);
    }

    #[test]
    fn test_controller_missing_port() {
        assert!(FactoryController::open(Some("/nonexistent/smart-factory-port")).is_err());
    }
}
