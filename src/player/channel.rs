//! Sync Channel Adapter - join, publish, receive and leave a named channel.
//!
//! Every joiner gets a fresh origin tag. Outgoing frames carry it and the inbox
//! drops frames that carry its own tag, so a context never observes its own
//! messages even on transports that echo back to the sender.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use futures_channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures_util::future::ready;
use futures_util::stream::{LocalBoxStream, StreamExt};
use futures_util::FutureExt;
use tracing::{debug, warn};

use super::error::SyncError;
use super::message::{Envelope, SyncMessage};

/// An open subscription on the underlying broadcast primitive.
pub trait ChannelTransport {
    fn post(&self, frame: &str) -> Result<(), SyncError>;
    fn close(&self);
}

/// Opens transports. Incoming frames are pushed into `sink`.
pub trait ChannelConnector {
    fn connect(
        &self,
        channel_name: &str,
        sink: UnboundedSender<String>,
    ) -> Result<Box<dyn ChannelTransport>, SyncError>;
}

/// Join `channel_name` and split the membership into its sending and receiving halves.
pub fn join(
    connector: &dyn ChannelConnector,
    channel_name: &str,
) -> Result<(SyncPublisher, SyncInbox), SyncError> {
    let origin = uuid::Uuid::new_v4().to_string();
    let (sink, frames) = unbounded();
    let transport = connector.connect(channel_name, sink)?;
    debug!(channel = channel_name, %origin, "joined sync channel");

    let publisher = SyncPublisher {
        inner: Rc::new(PublisherInner {
            origin: origin.clone(),
            channel_name: channel_name.to_string(),
            transport,
            closed: Cell::new(false),
        }),
    };
    Ok((publisher, SyncInbox { origin, frames }))
}

struct PublisherInner {
    origin: String,
    channel_name: String,
    transport: Box<dyn ChannelTransport>,
    closed: Cell<bool>,
}

/// Sending half of a channel membership. Clones share the membership, so
/// leaving through any clone closes it for all of them.
#[derive(Clone)]
pub struct SyncPublisher {
    inner: Rc<PublisherInner>,
}

impl SyncPublisher {
    pub fn origin(&self) -> &str {
        &self.inner.origin
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.get()
    }

    pub fn publish(&self, message: &SyncMessage) -> Result<(), SyncError> {
        if self.is_closed() {
            return Err(SyncError::Closed);
        }
        let frame = Envelope::new(self.inner.origin.clone(), message.clone()).encode();
        self.inner.transport.post(&frame)
    }

    /// Safe to call any number of times.
    pub fn leave(&self) {
        if self.inner.closed.replace(true) {
            return;
        }
        self.inner.transport.close();
        debug!(channel = %self.inner.channel_name, "left sync channel");
    }
}

/// Receiving half of a channel membership.
pub struct SyncInbox {
    origin: String,
    frames: UnboundedReceiver<String>,
}

fn accept_frame(own_origin: &str, frame: &str) -> Option<SyncMessage> {
    match Envelope::decode(frame) {
        Ok(envelope) if envelope.origin.as_deref() == Some(own_origin) => None,
        Ok(envelope) => Some(envelope.message),
        Err(err) => {
            debug!(%err, "dropping sync frame");
            None
        }
    }
}

impl SyncInbox {
    /// Every foreign message that has already arrived, without waiting.
    pub fn drain(&mut self) -> Vec<SyncMessage> {
        let mut messages = Vec::new();
        while let Some(Some(frame)) = self.frames.next().now_or_never() {
            if let Some(message) = accept_frame(&self.origin, &frame) {
                messages.push(message);
            }
        }
        messages
    }

    pub fn into_stream(self) -> LocalBoxStream<'static, SyncMessage> {
        let origin = self.origin;
        self.frames
            .filter_map(move |frame| ready(accept_frame(&origin, &frame)))
            .boxed_local()
    }
}

/// In-process broadcast hub. Unlike a browser `BroadcastChannel` it delivers
/// every frame to the sender too; the inbox filter takes care of that.
#[derive(Clone, Default)]
pub struct MemoryBus {
    channels: Rc<RefCell<HashMap<String, Vec<(u64, UnboundedSender<String>)>>>>,
    next_id: Rc<Cell<u64>>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscriber_count(&self, channel_name: &str) -> usize {
        self.channels
            .borrow()
            .get(channel_name)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

impl ChannelConnector for MemoryBus {
    fn connect(
        &self,
        channel_name: &str,
        sink: UnboundedSender<String>,
    ) -> Result<Box<dyn ChannelTransport>, SyncError> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.channels
            .borrow_mut()
            .entry(channel_name.to_string())
            .or_default()
            .push((id, sink));

        Ok(Box::new(MemoryTransport {
            bus: self.clone(),
            channel_name: channel_name.to_string(),
            id,
        }))
    }
}

struct MemoryTransport {
    bus: MemoryBus,
    channel_name: String,
    id: u64,
}

impl ChannelTransport for MemoryTransport {
    fn post(&self, frame: &str) -> Result<(), SyncError> {
        let mut channels = self.bus.channels.borrow_mut();
        let Some(subscribers) = channels.get_mut(&self.channel_name) else {
            return Err(SyncError::Closed);
        };
        subscribers.retain(|(id, sink)| {
            let delivered = sink.unbounded_send(frame.to_string()).is_ok();
            if !delivered {
                warn!(subscriber = id, "pruning dropped memory bus subscriber");
            }
            delivered
        });
        Ok(())
    }

    fn close(&self) {
        if let Some(subscribers) = self.bus.channels.borrow_mut().get_mut(&self.channel_name) {
            subscribers.retain(|(id, _)| *id != self.id);
        }
    }
}
