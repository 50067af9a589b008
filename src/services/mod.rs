pub mod codec;
pub mod staging;
pub mod storage;
pub mod transfer_service;
