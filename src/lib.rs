pub mod builders;
pub mod cli;
pub mod counter;
pub mod error;
pub mod generate;
pub mod html;
pub mod locator;
pub mod model;
pub mod output;
pub mod parsers;
pub mod payload;
pub mod renderer;
pub mod source_files;
pub mod transform;
