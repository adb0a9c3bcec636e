use mueue::*;

/// A component that can report what happened to an interested listener.
///
/// Notifications are best-effort: with no listener connected, or once the
/// listener went away, they are dropped.
pub trait Element {
    type Notification: Message;

    fn sender(&self) -> Option<MessageSender<Self::Notification>>;
    fn connect(&mut self, send: MessageSender<Self::Notification>);

    fn send(&self, msg: Self::Notification) {
        if let Some(send) = self.sender() {
            let _ = send.send(msg);
        }
    }
}
