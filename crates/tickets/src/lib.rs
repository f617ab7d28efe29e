//! `fixdesk-tickets`: maintenance call lifecycle.

pub mod call;

pub use call::{
    Attachment, CallCommand, CallEvent, CallId, CallNumber, CallStatus, Comment, MaintenanceCall,
    Priority,
};
