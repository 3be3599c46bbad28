use std::thread::{self, JoinHandle};
use tracing::{debug, info, trace, warn};

use super::{EventKind, RawInputEvent};

/// Downstream stream an event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    /// Key presses and releases
    Keyboard,
    /// Mouse button presses
    Mouse,
}

/// Per-kind event streams produced by the router
pub struct RoutedStreams {
    /// `KeyDown` and `KeyUp` events, in arrival order
    pub keyboard: flume::Receiver<RawInputEvent>,
    /// `MouseDown` events, in arrival order
    pub mouse: flume::Receiver<RawInputEvent>,
    /// Router thread; finishes once the source stream closes
    pub handle: JoinHandle<()>,
}

/// Stream for an event kind, `None` for kinds nobody consumes
#[must_use]
pub const fn classify(kind: EventKind) -> Option<Stream> {
    match kind {
        EventKind::KeyDown | EventKind::KeyUp => Some(Stream::Keyboard),
        EventKind::MouseDown => Some(Stream::Mouse),
        EventKind::MouseUp | EventKind::MouseMove | EventKind::Wheel => None,
    }
}

/// Split the raw source stream into keyboard and mouse streams
///
/// Both output streams are rendezvous channels fed by their own forwarding
/// thread, so a busy consumer holds back only its own stream. When the source
/// closes, both streams close once their queued events are delivered.
///
/// # Errors
/// Returns error if the router or a forwarding thread cannot be spawned
pub fn spawn(source: flume::Receiver<RawInputEvent>) -> std::io::Result<RoutedStreams> {
    let (keyboard_queue, keyboard_forwarder, keyboard) = forwarder(Stream::Keyboard)?;
    let (mouse_queue, mouse_forwarder, mouse) = forwarder(Stream::Mouse)?;

    let handle = thread::Builder::new()
        .name("input-router".to_owned())
        .spawn(move || {
            route(&source, &keyboard_queue, &mouse_queue);
            drop(keyboard_queue);
            drop(mouse_queue);
            for worker in [keyboard_forwarder, mouse_forwarder] {
                if worker.join().is_err() {
                    warn!("stream forwarder panicked");
                }
            }
        })?;

    Ok(RoutedStreams {
        keyboard,
        mouse,
        handle,
    })
}

type Forwarder = (
    flume::Sender<RawInputEvent>,
    JoinHandle<()>,
    flume::Receiver<RawInputEvent>,
);

/// Queue plus thread handing one stream's events to its consumer
fn forwarder(stream: Stream) -> std::io::Result<Forwarder> {
    let (queue_tx, queue) = flume::unbounded::<RawInputEvent>();
    let (output_tx, output) = flume::bounded(0);

    let name = match stream {
        Stream::Keyboard => "input-router-keyboard",
        Stream::Mouse => "input-router-mouse",
    };
    let handle = thread::Builder::new().name(name.to_owned()).spawn(move || {
        for event in queue.iter() {
            if output_tx.send(event).is_err() {
                debug!(?stream, "consumer gone, forwarder exiting");
                return;
            }
        }
        debug!(?stream, "stream drained, forwarder exiting");
    })?;

    Ok((queue_tx, handle, output))
}

fn route(
    source: &flume::Receiver<RawInputEvent>,
    keyboard: &flume::Sender<RawInputEvent>,
    mouse: &flume::Sender<RawInputEvent>,
) {
    info!("input router started");

    for event in source.iter() {
        let Some(stream) = classify(event.kind) else {
            continue;
        };
        let target = match stream {
            Stream::Keyboard => keyboard,
            Stream::Mouse => mouse,
        };

        trace!(?stream, kind = ?event.kind, keycode = event.keycode, "routing event");
        if target.send(event).is_err() {
            debug!(?stream, "consumer gone, dropping event");
            if keyboard.is_disconnected() && mouse.is_disconnected() {
                info!("all consumers gone, input router exiting");
                return;
            }
        }
    }

    info!("event source closed, input router exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_classify() {
        assert_eq!(classify(EventKind::KeyDown), Some(Stream::Keyboard));
        assert_eq!(classify(EventKind::KeyUp), Some(Stream::Keyboard));
        assert_eq!(classify(EventKind::MouseDown), Some(Stream::Mouse));
        assert_eq!(classify(EventKind::MouseUp), None);
        assert_eq!(classify(EventKind::MouseMove), None);
        assert_eq!(classify(EventKind::Wheel), None);
    }

    #[test]
    fn test_routes_by_kind_in_order() {
        let (tx, rx) = flume::unbounded();
        let streams = spawn(rx).unwrap();
        let mouse_stream = streams.mouse;
        let mouse_consumer = thread::spawn(move || mouse_stream.iter().collect::<Vec<_>>());

        tx.send(RawInputEvent::key_down(0x61)).unwrap();
        tx.send(RawInputEvent::mouse(EventKind::MouseMove, 1.0, 1.0))
            .unwrap();
        tx.send(RawInputEvent::mouse_down(10.0, 20.0)).unwrap();
        tx.send(RawInputEvent::key_up(0x61)).unwrap();
        tx.send(RawInputEvent::mouse(EventKind::Wheel, 0.0, 0.0))
            .unwrap();
        drop(tx);

        let keyboard: Vec<_> = streams.keyboard.iter().collect();
        let mouse = mouse_consumer.join().unwrap();
        streams.handle.join().unwrap();

        assert_eq!(keyboard.len(), 2);
        assert_eq!(keyboard[0].kind, EventKind::KeyDown);
        assert_eq!(keyboard[1].kind, EventKind::KeyUp);
        assert_eq!(mouse.len(), 1);
        assert_eq!(mouse[0].position, (10.0, 20.0));
    }

    #[test]
    fn test_source_close_closes_both_streams() {
        let (tx, rx) = flume::bounded::<RawInputEvent>(0);
        let streams = spawn(rx).unwrap();
        drop(tx);

        assert!(streams.keyboard.recv().is_err());
        assert!(streams.mouse.recv().is_err());
        streams.handle.join().unwrap();
    }

    #[test]
    fn test_busy_keyboard_consumer_does_not_hold_back_mouse() {
        let (tx, rx) = flume::bounded(0);
        let streams = spawn(rx).unwrap();

        // nobody reads the keyboard stream
        tx.send(RawInputEvent::key_down(0x61)).unwrap();
        tx.send(RawInputEvent::mouse_down(1.0, 2.0)).unwrap();

        let click = streams
            .mouse
            .recv_timeout(Duration::from_millis(500))
            .expect("mouse event held back by keyboard stream");
        assert_eq!(click.position, (1.0, 2.0));

        // the keyboard event is still delivered, in order
        tx.send(RawInputEvent::key_up(0x61)).unwrap();
        let keys: Vec<_> = (0..2)
            .map(|_| streams.keyboard.recv_timeout(Duration::from_millis(500)).unwrap())
            .collect();
        assert_eq!(keys[0].kind, EventKind::KeyDown);
        assert_eq!(keys[1].kind, EventKind::KeyUp);

        drop(tx);
        streams.handle.join().unwrap();
    }

    #[test]
    fn test_busy_mouse_consumer_does_not_hold_back_keyboard() {
        let (tx, rx) = flume::bounded(0);
        let streams = spawn(rx).unwrap();

        tx.send(RawInputEvent::mouse_down(5.0, 5.0)).unwrap();
        tx.send(RawInputEvent::mouse_down(6.0, 6.0)).unwrap();
        tx.send(RawInputEvent::key_down(0x62)).unwrap();

        let key = streams
            .keyboard
            .recv_timeout(Duration::from_millis(500))
            .expect("keyboard event held back by mouse stream");
        assert_eq!(key.keycode, 0x62);

        drop(tx);
        let clicks: Vec<_> = streams.mouse.iter().collect();
        assert_eq!(clicks.len(), 2);
        streams.handle.join().unwrap();
    }

    #[test]
    fn test_keeps_routing_when_one_consumer_is_gone() {
        let (tx, rx) = flume::unbounded();
        let streams = spawn(rx).unwrap();
        drop(streams.mouse);

        tx.send(RawInputEvent::mouse_down(1.0, 2.0)).unwrap();
        tx.send(RawInputEvent::key_down(0x62)).unwrap();
        drop(tx);

        let keyboard: Vec<_> = streams.keyboard.iter().collect();
        assert_eq!(keyboard.len(), 1);
        assert_eq!(keyboard[0].keycode, 0x62);
        streams.handle.join().unwrap();
    }
}
