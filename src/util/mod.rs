pub mod bit_vec;
pub mod chunked_queue;
pub mod errors;
pub mod index;
pub mod logging;
pub mod options;
pub mod results;
