//! Directory listing and remote lookup against an in-memory remote system.

mod common;

use std::sync::Arc;

use common::{Call, FakeMvs, parse, provider, uri};
use dsfs_provider::{DatasetRecord, FileType, ReadDirEntry, RemoteError};

fn names(listing: &[ReadDirEntry]) -> Vec<(&str, FileType)> {
    listing.iter().map(|e| (e.name.as_str(), e.kind)).collect()
}

// ============================================================================
// Filter listings
// ============================================================================

#[tokio::test]
async fn test_filter_patterns_normalized_before_querying() {
    common::init_tracing();
    let mvs = FakeMvs::with_bulk_listing();
    mvs.add_record(DatasetRecord::new("A.ONE"));
    mvs.add_record(DatasetRecord::new("B.TWO"));
    let provider = provider(&mvs);

    provider
        .create_filter(&uri("/lpar"), Some(" a.*, A.* ,b.*".to_string()))
        .unwrap();
    let listing = provider.read_directory(&uri("/lpar")).await.unwrap();

    assert_eq!(
        mvs.calls(),
        vec![Call::ListPatterns(vec!["A.*".to_string(), "B.*".to_string()])]
    );
    assert_eq!(
        names(&listing),
        vec![("A.ONE", FileType::File), ("B.TWO", FileType::File)]
    );
}

#[tokio::test]
async fn test_filter_falls_back_to_one_call_per_pattern() {
    let mvs = FakeMvs::new();
    mvs.add_record(DatasetRecord::new("A.ONE"));
    mvs.add_record(DatasetRecord::new("B.TWO"));
    let provider = provider(&mvs);

    provider
        .create_filter(&uri("/lpar"), Some("a.*,b.*".to_string()))
        .unwrap();
    let listing = provider.read_directory(&uri("/lpar")).await.unwrap();

    assert_eq!(
        mvs.calls(),
        vec![
            Call::DataSet {
                pattern: "A.*".to_string(),
                attributes: false
            },
            Call::DataSet {
                pattern: "B.*".to_string(),
                attributes: false
            },
        ]
    );
    assert_eq!(listing.len(), 2);
}

#[tokio::test]
async fn test_filter_classifies_and_drops_vsam() {
    let mvs = FakeMvs::new();
    mvs.add_record(DatasetRecord::new("X.A").with_dsorg("PO"));
    mvs.add_record(DatasetRecord::new("X.B"));
    mvs.add_record(DatasetRecord::new("X.C").with_dsorg("VS"));
    mvs.add_record(DatasetRecord::new("X.D").with_migr("YES"));
    let provider = provider(&mvs);

    provider
        .create_filter(&uri("/lpar"), Some("X.*".to_string()))
        .unwrap();
    let listing = provider.read_directory(&uri("/lpar")).await.unwrap();

    assert_eq!(
        names(&listing),
        vec![
            ("X.A", FileType::Directory),
            ("X.B", FileType::File),
            ("X.D", FileType::File),
        ]
    );
    assert!(!provider.exists(&uri("/lpar/X.C")));
    let pds = provider.lookup(&uri("/lpar/X.A"), false).unwrap().unwrap();
    assert!(pds.read().is_pds());
}

#[tokio::test]
async fn test_filter_listing_keeps_existing_entries() {
    let mvs = FakeMvs::new();
    mvs.add_record(DatasetRecord::new("X.SEQ"));
    let provider = provider(&mvs);
    provider
        .create_filter(&uri("/lpar"), Some("X.*".to_string()))
        .unwrap();

    provider.read_directory(&uri("/lpar")).await.unwrap();
    let first = provider.lookup(&uri("/lpar/X.SEQ"), false).unwrap().unwrap();
    first.write().set_data(b"pending edit".to_vec());

    provider.read_directory(&uri("/lpar")).await.unwrap();
    let second = provider.lookup(&uri("/lpar/X.SEQ"), false).unwrap().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.read().file().unwrap().data(), b"pending edit");
}

#[tokio::test]
async fn test_pattern_query_sets_filter_and_lists() {
    let mvs = FakeMvs::new();
    mvs.add_record(DatasetRecord::new("USER.DATA"));
    let provider = provider(&mvs);

    let listing = provider
        .read_directory(&parse("zowe-ds:/lpar?pattern=user.*"))
        .await
        .unwrap();
    assert_eq!(names(&listing), vec![("USER.DATA", FileType::File)]);
    // Listed once, by the lookup.
    assert_eq!(mvs.calls().len(), 1);
}

#[tokio::test]
async fn test_dot_paths_never_reach_remote() {
    let mvs = FakeMvs::new();
    let provider = provider(&mvs);
    let err = provider
        .read_directory(&parse("zowe-ds:/lpar/.vscode?fetch=true"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(mvs.calls().is_empty());
}

// ============================================================================
// Member listings
// ============================================================================

#[tokio::test]
async fn test_pds_lists_members() {
    let mvs = FakeMvs::new();
    mvs.add_record(DatasetRecord::new("USER.PDS").with_dsorg("PO"));
    mvs.add_member("USER.PDS", "ALPHA");
    mvs.add_member("USER.PDS", "BETA");
    let provider = provider(&mvs);
    provider
        .create_filter(&uri("/lpar"), Some("USER.*".to_string()))
        .unwrap();
    provider.read_directory(&uri("/lpar")).await.unwrap();

    let listing = provider
        .read_directory(&uri("/lpar/USER.PDS"))
        .await
        .unwrap();
    assert_eq!(
        names(&listing),
        vec![("ALPHA", FileType::File), ("BETA", FileType::File)]
    );

    let member = provider
        .lookup(&uri("/lpar/USER.PDS/ALPHA"), false)
        .unwrap()
        .unwrap();
    let member = member.read();
    assert_eq!(member.metadata.as_ref().unwrap().ds_name(), "USER.PDS(ALPHA)");
}

#[tokio::test]
async fn test_member_listing_server_error_is_empty() {
    let mvs = FakeMvs::new();
    mvs.fail_members_with(RemoteError::with_status("internal error", 500));
    let provider = provider(&mvs);
    provider.create_directory(&uri("/lpar")).unwrap();
    provider.create_directory(&uri("/lpar/USER.PDS")).unwrap();

    let listing = provider
        .read_directory(&uri("/lpar/USER.PDS"))
        .await
        .unwrap();
    assert!(listing.is_empty());
}

#[tokio::test]
async fn test_member_listing_other_errors_propagate() {
    let mvs = FakeMvs::new();
    mvs.fail_members_with(RemoteError::with_status("not authorized", 403));
    let provider = provider(&mvs);
    provider.create_directory(&uri("/lpar")).unwrap();
    provider.create_directory(&uri("/lpar/USER.PDS")).unwrap();

    assert!(provider.read_directory(&uri("/lpar/USER.PDS")).await.is_err());
}

// ============================================================================
// Remote lookup
// ============================================================================

#[tokio::test]
async fn test_remote_lookup_creates_sequential_entry() {
    let mvs = FakeMvs::new();
    mvs.add_record(DatasetRecord::new("USER.SEQ").with_vol("VOL001"));
    let provider = provider(&mvs);

    let stat = provider
        .stat(&parse("zowe-ds:/lpar/USER.SEQ?fetch=true"))
        .await
        .unwrap();
    assert!(stat.is_file());
    assert_eq!(
        mvs.calls(),
        vec![Call::DataSet {
            pattern: "USER.SEQ".to_string(),
            attributes: true
        }]
    );
    let entry = provider.lookup(&uri("/lpar/USER.SEQ"), false).unwrap().unwrap();
    assert_eq!(entry.read().stats().unwrap().vol.as_deref(), Some("VOL001"));
}

#[tokio::test]
async fn test_remote_lookup_of_pds_lists_members() {
    let mvs = FakeMvs::new();
    mvs.add_record(DatasetRecord::new("USER.PDS").with_dsorg("PO-E"));
    mvs.add_member("USER.PDS", "MEM");
    let provider = provider(&mvs);

    let listing = provider
        .read_directory(&parse("zowe-ds:/lpar/USER.PDS?fetch=true"))
        .await
        .unwrap();
    assert_eq!(names(&listing), vec![("MEM", FileType::File)]);
    assert!(provider.exists(&uri("/lpar/USER.PDS/MEM")));
}

#[tokio::test]
async fn test_remote_lookup_of_member() {
    let mvs = FakeMvs::new();
    mvs.add_member("USER.PDS", "MEM");
    let provider = provider(&mvs);

    let entry = provider
        .remote_lookup_for_resource(&uri("/lpar/USER.PDS/MEM"))
        .await
        .unwrap();
    assert!(entry.read().is_file());
    let pds = provider.lookup(&uri("/lpar/USER.PDS"), false).unwrap().unwrap();
    assert!(pds.read().is_pds());

    let err = provider
        .remote_lookup_for_resource(&uri("/lpar/USER.PDS/GONE"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_remote_lookup_unknown_data_set() {
    let mvs = FakeMvs::new();
    let provider = provider(&mvs);
    let err = provider
        .stat(&parse("zowe-ds:/lpar/NO.SUCH?fetch=true"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(!provider.exists(&uri("/lpar/NO.SUCH")));
}
