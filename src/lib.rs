//! Telegram front end for a VPS OS-install queue.
//!
//! The bot registers users, takes install requests and files them into two
//! JSON documents (`users.json` and `installs.json`). A separate worker
//! process consumes the queue; nothing in here ever connects to a VPS.

pub mod accounts;
pub mod catalog;
pub mod config;
pub mod handlers;
pub mod installs;
pub mod replies;
pub mod storage;
