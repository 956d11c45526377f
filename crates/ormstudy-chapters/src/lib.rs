//! ormstudy Chapters - runnable mapping demonstrations
//!
//! Each chapter owns its schema, its entity structs and a sequence of demo
//! steps. `run_chapter` builds a dedicated session factory for the chapter
//! and executes every step inside one unit of work.

pub mod chapter;
pub mod ch02;
pub mod ch03;
pub mod ch05;
pub mod ch06;
pub mod ch07;
pub mod ch08;
pub mod ch09;
pub mod ch10;
pub mod ch14;

pub use chapter::{run_chapter, Chapter, ChapterReport};
