// Turning YouTube references into playable audio stream URLs

pub mod extractor;
pub mod resolver;
pub mod connectivity;
