//! # Events Module
//!
//! Event-driven reporting for scanning, matching and resolution.
//!
//! ## Design
//! The engine emits events through channels, allowing any front end
//! (CLI, web, tests) to subscribe and display progress.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         match event {
//!             Event::Scan(ScanEvent::Progress(p)) => println!("{} ready", p.working_set),
//!             Event::Resolve(ResolveEvent::Moved { from, .. }) => println!("moved {:?}", from),
//!             _ => {}
//!         }
//!     }
//! });
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
