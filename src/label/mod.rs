//! Label identity and machine-readable encodings

pub mod code;
pub mod encoder;

pub use code::{LabelCode, LabelCodeGenerator};
pub use encoder::{EncodedLabel, EncoderSettings, LabelEncoder};
