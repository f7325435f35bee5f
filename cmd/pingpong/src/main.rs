//! Ping-pong over two rendezvous channels (spec §8, scenario 3).
//!
//! Task P writes "ping" to channel A, then reads channel B. Task Q
//! reads channel A, then writes "pong" to channel B. Three round
//! trips run, then every handle each task held is dropped; a read
//! attempted afterward on a handle kept around in `main` observes
//! `ChannelClosed`.

use std::sync::{Arc, Condvar, Mutex};

use corio::{make_channel, CorioError, CorioResult, ChannelConfig, Reactor, ReactorConfig, Sender};

/// Block the calling thread until `sender` completes, returning its
/// value. Mirrors `corio_core::wait`, which discards the value; this
/// keeps it, the way a CLI demo that actually wants the channel's
/// payload needs to.
///
/// The receiver owns its slot through an `Arc` rather than borrowing a
/// stack frame: the channel senders this drives require `Send +
/// 'static` receivers, since a rendezvous read/write can hand its
/// completion off to whichever thread is on the other end of the
/// channel (see `corio_core::wait` for the same shape).
fn block_on_sender<S>(sender: S) -> CorioResult<S::Value>
where
    S: Sender,
    S::Value: Send + 'static,
    S::Error: Into<CorioError>,
{
    enum Slot<T> {
        Pending,
        Value(T),
        Error(CorioError),
        Done,
    }

    struct State<T> {
        slot: Mutex<Slot<T>>,
        cond: Condvar,
    }

    struct SlotReceiver<T> {
        state: Arc<State<T>>,
    }

    impl<T: Send + 'static, E: Into<CorioError>> corio::Receiver<T, E> for SlotReceiver<T> {
        fn set_value(self, value: T) {
            *self.state.slot.lock().unwrap() = Slot::Value(value);
            self.state.cond.notify_one();
        }
        fn set_error(self, error: E) {
            *self.state.slot.lock().unwrap() = Slot::Error(error.into());
            self.state.cond.notify_one();
        }
        fn set_done(self) {
            *self.state.slot.lock().unwrap() = Slot::Done;
            self.state.cond.notify_one();
        }
    }

    let state = Arc::new(State {
        slot: Mutex::new(Slot::Pending),
        cond: Condvar::new(),
    });
    let mut op = sender.connect(SlotReceiver {
        state: state.clone(),
    });
    // SAFETY: `op` lives on this stack frame until this function
    // returns and is never moved after this point.
    unsafe { std::pin::Pin::new_unchecked(&mut op) }.start();

    let mut guard = state.slot.lock().unwrap();
    loop {
        match &*guard {
            Slot::Pending => guard = state.cond.wait(guard).unwrap(),
            _ => break,
        }
    }
    match std::mem::replace(&mut *guard, Slot::Pending) {
        Slot::Value(v) => Ok(v),
        Slot::Done => Err(CorioError::Cancelled),
        Slot::Error(e) => Err(e),
        Slot::Pending => unreachable!(),
    }
}

const ROUNDS: usize = 3;

fn main() {
    let reactor = Reactor::start(ReactorConfig::default()).expect("reactor start");

    let (a_read, a_write) = make_channel::<String>(reactor.handle(), ChannelConfig::rendezvous());
    let (b_read, b_write) = make_channel::<String>(reactor.handle(), ChannelConfig::rendezvous());

    // Kept in `main` so the post-close read below has a handle to call
    // through once both tasks have dropped theirs.
    let b_read_after_close = b_read.clone();

    let p = std::thread::Builder::new()
        .name("ping".to_string())
        .spawn(move || {
            let mut replies = Vec::with_capacity(ROUNDS);
            for _ in 0..ROUNDS {
                block_on_sender(a_write.write("ping".to_string())).expect("write ping");
                let reply = block_on_sender(b_read.read()).expect("read pong");
                replies.push(reply);
            }
            replies
        })
        .expect("spawn ping thread");

    let q = std::thread::Builder::new()
        .name("pong".to_string())
        .spawn(move || {
            for _ in 0..ROUNDS {
                let msg = block_on_sender(a_read.read()).expect("read ping");
                assert_eq!(msg, "ping");
                block_on_sender(b_write.write("pong".to_string())).expect("write pong");
            }
        })
        .expect("spawn pong thread");

    let replies = p.join().expect("ping thread panicked");
    q.join().expect("pong thread panicked");

    assert_eq!(replies, vec!["pong", "pong", "pong"]);
    println!("observed on B: {replies:?}");

    match block_on_sender(b_read_after_close.read()) {
        Err(CorioError::ChannelClosed) => {
            println!("read after close correctly observed ChannelClosed");
        }
        other => panic!("expected ChannelClosed after both task handles dropped, got {other:?}"),
    }
}
