mod markdown;

pub use markdown::*;

pub use pulldown_cmark::Options;
