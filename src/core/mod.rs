pub mod answer_key;
pub mod conversation;
pub mod director;
pub mod grading;
pub mod scheduler;
pub mod script;
pub mod session;
pub mod template;
pub mod timeline;
