use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicU8, Ordering};
use std::thread;
use std::time::{Duration, Instant};

const EMPTY: u8 = 0;
const WRITING: u8 = 1;
const READY: u8 = 2;
const TAKEN: u8 = 3;

/// ### English
/// One-shot, single-producer single-consumer value handoff.
///
/// Used to hand a freshly created GPU fence from the driver's completion callback back to the
/// thread that requested it. The requesting thread parks until the value arrives (or times out).
///
/// - No locks.
/// - The waiting thread is captured at construction so the sender can `unpark()` it.
///
/// ### 中文
/// 一次性的单生产者/单消费者值传递。
///
/// 用于把驱动完成回调中新创建的 GPU fence 交回给发起请求的线程；请求线程会 park 直到值到达（或超时）。
///
/// - 无锁。
/// - 构造时记录等待线程，发送方完成后可 `unpark()` 唤醒。
pub(crate) struct OneShot<T> {
    /// ### English
    /// `EMPTY` → `WRITING` → `READY` → `TAKEN`.
    ///
    /// ### 中文
    /// 状态流转：`EMPTY` → `WRITING` → `READY` → `TAKEN`。
    state: AtomicU8,
    /// ### English
    /// Payload written by the sender and read once by the receiver.
    ///
    /// ### 中文
    /// 载荷：由发送方写入，接收方读取一次。
    value: UnsafeCell<MaybeUninit<T>>,
    /// ### English
    /// Thread that waits in [`Self::recv_timeout`].
    ///
    /// ### 中文
    /// 在 [`Self::recv_timeout`] 中等待的线程。
    waiter: thread::Thread,
}

unsafe impl<T: Send> Send for OneShot<T> {}
unsafe impl<T: Send> Sync for OneShot<T> {}

impl<T> OneShot<T> {
    /// ### English
    /// Creates an empty slot whose receiver is the calling thread.
    ///
    /// ### 中文
    /// 创建一个空槽位，接收方为当前调用线程。
    #[inline]
    pub(crate) fn for_current_thread() -> Self {
        Self {
            state: AtomicU8::new(EMPTY),
            value: UnsafeCell::new(MaybeUninit::uninit()),
            waiter: thread::current(),
        }
    }

    /// ### English
    /// Sends the value. Returns `false` (dropping `value`) if a value was already sent.
    ///
    /// ### 中文
    /// 发送值；若此前已发送过则返回 `false`（并丢弃 `value`）。
    #[inline]
    pub(crate) fn send(&self, value: T) -> bool {
        if self
            .state
            .compare_exchange(EMPTY, WRITING, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return false;
        }

        unsafe {
            (*self.value.get()).write(value);
        }
        self.state.store(READY, Ordering::Release);
        self.waiter.unpark();
        true
    }

    /// ### English
    /// Takes the value if it has arrived.
    ///
    /// ### 中文
    /// 若值已到达则取走（非阻塞）。
    #[inline]
    pub(crate) fn try_recv(&self) -> Option<T> {
        self.state
            .compare_exchange(READY, TAKEN, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| unsafe { (*self.value.get()).assume_init_read() })
    }

    /// ### English
    /// Parks the calling thread until the value arrives or `timeout` elapses.
    ///
    /// ### 中文
    /// park 当前线程，直到值到达或 `timeout` 超时。
    pub(crate) fn recv_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(value) = self.try_recv() {
                return Some(value);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            thread::park_timeout(deadline - now);
        }
    }
}

impl<T> Drop for OneShot<T> {
    fn drop(&mut self) {
        if self.state.load(Ordering::Acquire) == READY {
            unsafe {
                drop((*self.value.get()).assume_init_read());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn second_send_is_rejected() {
        let slot = OneShot::for_current_thread();
        assert!(slot.send(1u32));
        assert!(!slot.send(2u32));
        assert_eq!(slot.try_recv(), Some(1));
        assert_eq!(slot.try_recv(), None);
    }

    #[test]
    fn receives_from_another_thread() {
        let slot = Arc::new(OneShot::for_current_thread());
        let sender = slot.clone();
        let join = thread::spawn(move || {
            assert!(sender.send(String::from("fence")));
        });
        let value = slot.recv_timeout(Duration::from_secs(5));
        join.join().unwrap();
        assert_eq!(value.as_deref(), Some("fence"));
    }

    #[test]
    fn times_out_when_nothing_is_sent() {
        let slot: OneShot<u8> = OneShot::for_current_thread();
        assert_eq!(slot.recv_timeout(Duration::from_millis(5)), None);
    }
}
