//! # Selser DOM
//!
//! Arena document tree shared by the markup front end, the diff and
//! selective serialization engine, and the change simulator.
//!
//! - [`tree`]: nodes addressed by [`NodeId`], with parent and child links
//!   stored as indices
//! - [`provenance`]: source ranges and syntax hints recorded at parse time
//! - [`html`]: DOM string reader/writer, persisting provenance as JSON
//! - [`config`]: block tags, atomic unit markers and the other constants the
//!   traversals consult
//! - [`serialize`]: the collaborator traits for full serialization and parsing

pub mod config;
pub mod entities;
pub mod error;
pub mod html;
pub mod lexer;
pub mod provenance;
pub mod serialize;
pub mod tree;
pub mod visitor;

pub use config::SelserConfig;
pub use error::{DomError, DomResult};
pub use html::{inner_html, parse_html, to_html, HtmlOptions, HtmlReader};
pub use provenance::{Dsr, Provenance, Stx};
pub use serialize::{NodeSerializer, SourceParser};
pub use tree::{Attributes, Node, NodeData, NodeId, NodeKind, Tree};
pub use visitor::{Visitor, VisitorMut};
