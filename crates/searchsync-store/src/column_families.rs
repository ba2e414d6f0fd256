//! Column family definitions for RocksDB.
//!
//! Two column families with different access patterns:
//! - records: catalog record mirror, point lookups by id
//! - states: sync state rows, full scans for eligibility plus point writes

use rocksdb::{ColumnFamilyDescriptor, Options};

/// Column family name for catalog records
pub const CF_RECORDS: &str = "records";

/// Column family name for sync state rows
pub const CF_STATES: &str = "states";

/// All column family names
pub const ALL_CF_NAMES: &[&str] = &[CF_RECORDS, CF_STATES];

/// Create column family options for records (compressed, write-heavy)
fn records_options() -> Options {
    let mut opts = Options::default();
    opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
    opts
}

/// Build all column family descriptors
pub fn build_cf_descriptors() -> Vec<ColumnFamilyDescriptor> {
    vec![
        ColumnFamilyDescriptor::new(CF_RECORDS, records_options()),
        ColumnFamilyDescriptor::new(CF_STATES, Options::default()),
    ]
}
