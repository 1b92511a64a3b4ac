//! Page markup parsing and node-tree transformations.
//!
//! Pure code, no I/O:
//! - [`parser`] turns stored page lines into [`Block`]s of [`Node`]s
//! - [`process`] rebuilds trees through a [`NodeProcessor`], pruning empty composites
//! - [`classify`] resolves links, hashtags and icons against the visible titles
//! - [`text`] flattens trees into plain text

pub mod ast;
pub mod classify;
pub mod parser;
pub mod process;
pub mod text;

pub use ast::{Block, Deco, Node, ParsedBlock, PathType, walk_blocks, walk_nodes};
pub use classify::{Classifier, anchor_id};
pub use parser::{ParserOptions, is_image_url, parse, parse_description_nodes, parse_lines};
pub use process::{NodeProcessor, process_blocks, process_nodes};
pub use text::{block_to_text, descriptions_to_text, nodes_to_text};
