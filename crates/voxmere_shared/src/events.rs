use std::sync::mpsc;

use crate::coords::ChunkPos;

/// Notifications a renderer uses to keep its GPU buffers in step with the store.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MeshEvent {
    /// New meshes for `pos` are live. `replaced` is set when they superseded
    /// an older pair, which has already been dropped.
    Installed {
        pos: ChunkPos,
        opaque_quads: usize,
        fluid_quads: usize,
        replaced: bool,
    },
    /// The chunk at `pos` no longer has meshes.
    Released { pos: ChunkPos },
}

impl MeshEvent {
    pub fn pos(&self) -> ChunkPos {
        match *self {
            MeshEvent::Installed { pos, .. } | MeshEvent::Released { pos } => pos,
        }
    }
}

pub struct EventSender<T> {
    tx: mpsc::Sender<T>,
}

pub struct EventReceiver<T> {
    rx: mpsc::Receiver<T>,
}

pub fn channel<T>() -> (EventSender<T>, EventReceiver<T>) {
    let (tx, rx) = mpsc::channel();
    (EventSender { tx }, EventReceiver { rx })
}

impl<T> EventSender<T> {
    pub fn send(&self, event: T) -> Result<(), mpsc::SendError<T>> {
        self.tx.send(event)
    }
}

impl<T> EventReceiver<T> {
    /// Everything queued so far, without blocking.
    pub fn drain(&self) -> Vec<T> {
        self.rx.try_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{channel, MeshEvent};
    use crate::coords::ChunkPos;

    #[test]
    fn drain_returns_queued_events_in_order() {
        let (tx, rx) = channel();
        let pos = ChunkPos::new(1, 2, 3);
        tx.send(MeshEvent::Installed {
            pos,
            opaque_quads: 4,
            fluid_quads: 0,
            replaced: false,
        })
        .expect("receiver alive");
        tx.send(MeshEvent::Released { pos }).expect("receiver alive");

        let events = rx.drain();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|event| event.pos() == pos));
        assert!(matches!(events[1], MeshEvent::Released { .. }));
        assert!(rx.drain().is_empty());
    }

    #[test]
    fn send_fails_once_receiver_is_gone() {
        let (tx, rx) = channel::<MeshEvent>();
        drop(rx);
        assert!(tx
            .send(MeshEvent::Released {
                pos: ChunkPos::default()
            })
            .is_err());
    }
}
