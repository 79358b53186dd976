//! Layout placement and persistence engine for the dashboard builder.
//!
//! The builder offers two editing surfaces: a responsive grid of widget
//! blocks and a free-form node/edge flow canvas. Rendering, dragging physics
//! and compaction belong to the host UI. This crate owns the parts that have
//! to be right regardless of the UI: finding room for new blocks, keeping
//! per-breakpoint layouts consistent across drag/resize events, and moving
//! whole dashboards in and out of durable storage and portable JSON files.
//!
//! The host is expected to hold one [`editor::GridEditor`] or
//! [`flow::FlowEditor`] per open dashboard, forward UI events to it, and
//! re-render from the values it returns.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`block`] | Block kinds, size-constraint table, typed block payloads |
//! | [`grid`] | Occupancy grid and first-fit placement solver |
//! | [`layout`] | Breakpoints and layout-delta reconciliation |
//! | [`editor`] | Grid editing state ([`editor::GridEditor`]) |
//! | [`flow`] | Flow nodes/edges and [`flow::FlowEditor`] |
//! | [`store`] | Dashboard persistence over a key-value backend |
//! | [`codec`] | Export envelope, download filename, import parsing |
//! | [`config`] | Environment-driven configuration |
//! | [`consts`] | Shared constants (row ceiling, id prefixes, store key) |

pub mod block;
pub mod codec;
pub mod config;
pub mod consts;
pub mod editor;
pub mod flow;
pub mod grid;
pub mod layout;
pub mod store;
