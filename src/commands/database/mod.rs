pub mod mongodb_dump;

pub use mongodb_dump::{MongoDbDump, MongoDbDumpOptions};
