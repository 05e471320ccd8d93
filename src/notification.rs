/// Operator-facing channel for failures that must not pass silently.
pub trait Notifier {
    fn notify(&self, body: &str);
}

/// Desktop notification via the session's notification daemon.
#[derive(Debug, Clone, Copy, Default)]
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn notify(&self, body: &str) {
        send(body);
    }
}

pub fn send(body: impl Into<String>) {
    let body = body.into();
    if let Err(err) = notify_rust::Notification::new()
        .appname("meural-cropper")
        .summary("Meural Cropper")
        .body(&body)
        .show()
    {
        tracing::warn!("system notification failed: {err}; message was: {body}");
    }
}
