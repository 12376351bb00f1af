pub mod dispatcher;
pub mod emailjs;

pub use dispatcher::{dispatch_in_background, NotificationDispatcher, RecordingDispatcher};
pub use emailjs::EmailJsDispatcher;
