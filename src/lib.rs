pub mod traits {
    pub mod byte_stream;
    pub mod frame_decoder;
    pub mod frame_encoder;
    pub mod stream_buffer;
}

pub mod models {

    pub mod types {
        pub mod column;
        pub mod schema;
    }
    pub mod frames {
        pub mod wire_message;
    }
    pub mod encoders {
        pub mod batch;
        pub mod protocol;
        pub mod schema;
    }
    pub mod decoders {
        pub mod batch;
        pub mod protocol;
        pub mod schema;
        pub mod stream;
    }
    pub mod writers {
        pub mod stream_writer;
    }
    pub mod readers {
        pub mod stream_reader;
    }
    pub mod streams {
        pub mod disk;
    }
}

pub mod compression;
pub mod constants;
pub mod enums;
pub mod error;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use crate::compression::{Compression, DecompressFn, DecompressorRegistry};
pub use crate::error::IoError;
pub use crate::models::decoders::stream::StreamDecoder;
pub use crate::models::encoders::batch::BatchEncoder;
pub use crate::models::readers::stream_reader::StreamReader;
pub use crate::models::types::column::{Batch, Bitmask, Column, ColumnData};
pub use crate::models::types::schema::{Field, Schema, WireType};
pub use crate::models::writers::stream_writer::StreamWriter;
