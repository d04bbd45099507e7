pub mod decode;
pub mod gather;
pub mod make;
pub mod submit;
pub mod version;
