/// 事件队列: 多生产者 → 单消费者
/// Event channel shared by the capture lanes and the dispatch loop
use super::event::Event;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

/// 创建事件队列 (无界, 发送端从不阻塞)
pub fn event_channel() -> (Publisher, Consumer) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (Publisher { tx }, Consumer { rx })
}

/// 发送端, 每条lane持有一个克隆
#[derive(Clone, Debug)]
pub struct Publisher {
    tx: Sender<Event>,
}

impl Publisher {
    /// 发送事件, 不阻塞
    ///
    /// 消费者已退出时事件直接丢弃 (只会发生在关闭阶段)
    pub fn publish(&self, event: Event) {
        if let Err(e) = self.tx.send(event) {
            log::debug!("消费者已退出, 丢弃事件: {:?}", e.into_inner().lane());
        }
    }
}

/// 单次读取结果
#[derive(Debug)]
pub enum Received {
    Event(Event),
    /// 超时内没有事件 (正常情况, 用于轮询退出键)
    Empty,
    /// 所有发送端已释放且队列已空
    Closed,
}

/// 接收端, 只属于调度主线程
#[derive(Debug)]
pub struct Consumer {
    rx: Receiver<Event>,
}

impl Consumer {
    /// 最多等待 timeout, 返回最早的未读事件
    pub fn consume(&self, timeout: Duration) -> Received {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Received::Event(event),
            Err(RecvTimeoutError::Timeout) => Received::Empty,
            Err(RecvTimeoutError::Disconnected) => Received::Closed,
        }
    }

    /// 队列中待处理的事件数
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// 清空队列, 返回丢弃的事件数
    pub fn discard_pending(&self) -> usize {
        self.rx.try_iter().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xbus::Lane;
    use std::time::Instant;

    fn command(event: Event) -> u8 {
        match event {
            Event::ActuatorCommand { channel } => channel,
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_single_producer_fifo() {
        let (tx, rx) = event_channel();
        for channel in 0..100u8 {
            tx.publish(Event::ActuatorCommand { channel });
        }

        for expected in 0..100u8 {
            match rx.consume(Duration::from_millis(100)) {
                Received::Event(event) => assert_eq!(command(event), expected),
                other => panic!("expected event, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_two_producers_no_loss_no_duplicates() {
        let (tx, rx) = event_channel();
        let mut handles = Vec::new();
        for lane in 1..=2u8 {
            let tx = tx.clone();
            handles.push(std::thread::spawn(move || {
                // lane 1: 0..=99, lane 2: 100..=199
                let base = (lane - 1) * 100;
                for i in 0..100u8 {
                    tx.publish(Event::ActuatorCommand { channel: base + i });
                }
                tx.publish(Event::LaneFinished { lane: Lane(lane) });
            }));
        }
        drop(tx);
        for h in handles {
            h.join().unwrap();
        }

        let mut seen = vec![0u32; 200];
        let mut last_per_lane = [None::<u8>; 2];
        let mut finished = 0;
        loop {
            match rx.consume(Duration::from_millis(100)) {
                Received::Event(Event::ActuatorCommand { channel }) => {
                    seen[channel as usize] += 1;
                    // 同一生产者内部保持顺序
                    let slot = &mut last_per_lane[(channel / 100) as usize];
                    if let Some(prev) = *slot {
                        assert!(channel > prev);
                    }
                    *slot = Some(channel);
                }
                Received::Event(Event::LaneFinished { .. }) => finished += 1,
                Received::Event(other) => panic!("unexpected event: {:?}", other),
                Received::Empty => panic!("channel should not be idle"),
                Received::Closed => break,
            }
        }

        assert_eq!(finished, 2);
        assert!(seen.iter().all(|&n| n == 1));
    }

    #[test]
    fn test_consume_timeout_on_empty() {
        let (_tx, rx) = event_channel();
        let start = Instant::now();
        assert!(matches!(rx.consume(Duration::from_millis(20)), Received::Empty));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(20));
        assert!(elapsed < Duration::from_secs(2));
    }

    #[test]
    fn test_closed_after_publishers_dropped() {
        let (tx, rx) = event_channel();
        tx.publish(Event::ActuatorCommand { channel: 2 });
        drop(tx);

        assert!(matches!(rx.consume(Duration::from_millis(10)), Received::Event(_)));
        assert!(matches!(rx.consume(Duration::from_millis(10)), Received::Closed));
    }

    #[test]
    fn test_publish_after_consumer_dropped() {
        let (tx, rx) = event_channel();
        drop(rx);
        // 不阻塞也不panic
        tx.publish(Event::LaneFinished { lane: Lane(1) });
    }

    #[test]
    fn test_discard_pending() {
        let (tx, rx) = event_channel();
        for channel in 0..5 {
            tx.publish(Event::ActuatorCommand { channel });
        }
        assert_eq!(rx.pending(), 5);
        assert_eq!(rx.discard_pending(), 5);
        assert_eq!(rx.pending(), 0);
    }
}
