//! Shared fixtures: an in-memory remote system and a recording host.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use dsfs_provider::{
    ApiResponse, ConflictViewSelection, DataSetListOptions, DatasetFsProvider, DatasetRecord,
    DeleteDataSetOptions, DownloadOptions, DsUri, EditorHost, FsResult, MemberRecord, MvsApi,
    Profile, ProviderConfig, RemoteError, RemoteResult, UploadOptions,
};

pub const PROFILE: &str = "lpar";

pub fn uri(path: &str) -> DsUri {
    DsUri::new("zowe-ds", path)
}

pub fn parse(input: &str) -> DsUri {
    DsUri::parse(input).expect("valid test uri")
}

/// One recorded remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListPatterns(Vec<String>),
    DataSet { pattern: String, attributes: bool },
    AllMembers(String),
    GetContents { name: String, options: DownloadOptions },
    Upload { name: String, data: Vec<u8>, options: UploadOptions },
    Delete { name: String, options: DeleteDataSetOptions },
    Rename { old: String, new: String },
    RenameMember { pds: String, old: String, new: String },
}

#[derive(Debug, Default)]
struct RemoteState {
    /// Records returned for every data set listing, in order.
    records: Vec<DatasetRecord>,
    members: BTreeMap<String, Vec<String>>,
    /// Contents and current etag by remote name.
    contents: HashMap<String, (Vec<u8>, String)>,
    etag_counter: u64,
    calls: Vec<Call>,
    fail_members_with: Option<RemoteError>,
    fail_upload_with: Option<RemoteError>,
    fail_delete_with: Option<RemoteError>,
    fail_rename_with: Option<RemoteError>,
}

/// In-memory stand-in for the remote data set API.
#[derive(Debug, Default)]
pub struct FakeMvs {
    bulk_listing: bool,
    state: Mutex<RemoteState>,
}

impl FakeMvs {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fake that offers the multi-pattern listing call.
    pub fn with_bulk_listing() -> Arc<Self> {
        Arc::new(Self {
            bulk_listing: true,
            ..Default::default()
        })
    }

    pub fn add_record(&self, record: DatasetRecord) {
        self.state.lock().records.push(record);
    }

    pub fn add_member(&self, pds: &str, member: &str) {
        self.state
            .lock()
            .members
            .entry(pds.to_string())
            .or_default()
            .push(member.to_string());
    }

    /// Store remote contents, returning the new etag.
    pub fn put_contents(&self, name: &str, data: &[u8]) -> String {
        let mut state = self.state.lock();
        state.etag_counter += 1;
        let etag = format!("etag-{}", state.etag_counter);
        state
            .contents
            .insert(name.to_string(), (data.to_vec(), etag.clone()));
        etag
    }

    pub fn contents(&self, name: &str) -> Option<Vec<u8>> {
        self.state.lock().contents.get(name).map(|(d, _)| d.clone())
    }

    /// Drop a data set's contents, as if deleted elsewhere.
    pub fn remove_contents(&self, name: &str) {
        self.state.lock().contents.remove(name);
    }

    pub fn etag(&self, name: &str) -> Option<String> {
        self.state.lock().contents.get(name).map(|(_, e)| e.clone())
    }

    pub fn fail_members_with(&self, error: RemoteError) {
        self.state.lock().fail_members_with = Some(error);
    }

    pub fn fail_upload_with(&self, error: RemoteError) {
        self.state.lock().fail_upload_with = Some(error);
    }

    pub fn fail_delete_with(&self, error: RemoteError) {
        self.state.lock().fail_delete_with = Some(error);
    }

    pub fn fail_rename_with(&self, error: RemoteError) {
        self.state.lock().fail_rename_with = Some(error);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn uploads(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Upload { .. }))
            .collect()
    }

    fn record(&self, call: Call) {
        self.state.lock().calls.push(call);
    }

    fn matching(&self, pattern: &str) -> Vec<DatasetRecord> {
        let prefix = pattern.trim_end_matches('*');
        self.state
            .lock()
            .records
            .iter()
            .filter(|r| {
                if pattern.ends_with('*') {
                    r.dsname.starts_with(prefix)
                } else {
                    r.dsname == pattern
                }
            })
            .cloned()
            .collect()
    }
}

#[async_trait]
impl MvsApi for FakeMvs {
    async fn data_sets_matching_patterns(
        &self,
        patterns: &[String],
    ) -> Option<RemoteResult<Vec<DatasetRecord>>> {
        if !self.bulk_listing {
            return None;
        }
        self.record(Call::ListPatterns(patterns.to_vec()));
        Some(Ok(patterns.iter().flat_map(|p| self.matching(p)).collect()))
    }

    async fn data_set(
        &self,
        pattern: &str,
        options: DataSetListOptions,
    ) -> RemoteResult<Vec<DatasetRecord>> {
        self.record(Call::DataSet {
            pattern: pattern.to_string(),
            attributes: options.attributes,
        });
        Ok(self.matching(pattern))
    }

    async fn all_members(&self, pds: &str) -> RemoteResult<Vec<MemberRecord>> {
        self.record(Call::AllMembers(pds.to_string()));
        let state = self.state.lock();
        if let Some(error) = &state.fail_members_with {
            return Err(error.clone());
        }
        Ok(state
            .members
            .get(pds)
            .map(|m| m.iter().map(MemberRecord::new).collect())
            .unwrap_or_default())
    }

    async fn get_contents(
        &self,
        name: &str,
        options: &DownloadOptions,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> RemoteResult<ApiResponse> {
        self.record(Call::GetContents {
            name: name.to_string(),
            options: options.clone(),
        });
        let stored = self.state.lock().contents.get(name).cloned();
        let Some((data, etag)) = stored else {
            return Err(RemoteError::with_status(format!("{name} not found"), 404));
        };
        sink.write_all(&data)
            .await
            .map_err(|e| RemoteError::new(e.to_string()))?;
        Ok(ApiResponse::with_etag(etag))
    }

    async fn upload_from_buffer(
        &self,
        data: &[u8],
        name: &str,
        options: &UploadOptions,
    ) -> RemoteResult<ApiResponse> {
        self.record(Call::Upload {
            name: name.to_string(),
            data: data.to_vec(),
            options: options.clone(),
        });
        {
            let mut state = self.state.lock();
            if let Some(error) = state.fail_upload_with.take() {
                return Err(error);
            }
            if let (Some(expected), Some((_, current))) = (&options.etag, state.contents.get(name)) {
                if expected != current {
                    return Err(RemoteError::new("Rest API failure with HTTP(S) status 412"));
                }
            }
        }
        Ok(ApiResponse::with_etag(self.put_contents(name, data)))
    }

    async fn delete_data_set(
        &self,
        name: &str,
        options: &DeleteDataSetOptions,
    ) -> RemoteResult<()> {
        self.record(Call::Delete {
            name: name.to_string(),
            options: options.clone(),
        });
        let mut state = self.state.lock();
        if let Some(error) = state.fail_delete_with.take() {
            return Err(error);
        }
        state.contents.remove(name);
        Ok(())
    }

    async fn rename_data_set(&self, old: &str, new: &str) -> RemoteResult<()> {
        self.record(Call::Rename {
            old: old.to_string(),
            new: new.to_string(),
        });
        let mut state = self.state.lock();
        if let Some(error) = state.fail_rename_with.take() {
            return Err(error);
        }
        let moved: Vec<String> = state
            .contents
            .keys()
            .filter(|k| *k == old || k.starts_with(&format!("{old}(")))
            .cloned()
            .collect();
        for key in moved {
            if let Some(value) = state.contents.remove(&key) {
                state.contents.insert(format!("{new}{}", &key[old.len()..]), value);
            }
        }
        Ok(())
    }

    async fn rename_data_set_member(&self, pds: &str, old: &str, new: &str) -> RemoteResult<()> {
        self.record(Call::RenameMember {
            pds: pds.to_string(),
            old: old.to_string(),
            new: new.to_string(),
        });
        let mut state = self.state.lock();
        if let Some(error) = state.fail_rename_with.take() {
            return Err(error);
        }
        if let Some(value) = state.contents.remove(&format!("{pds}({old})")) {
            state.contents.insert(format!("{pds}({new})"), value);
        }
        Ok(())
    }
}

/// Host that records everything shown to the user.
#[derive(Debug)]
pub struct RecordingHost {
    selection: Mutex<ConflictViewSelection>,
    pub errors: Mutex<Vec<String>>,
    pub messages: Mutex<Vec<String>>,
    pub statuses: Mutex<Vec<String>>,
    pub prompts: Mutex<Vec<String>>,
    pub diffs: Mutex<Vec<(DsUri, DsUri, String)>>,
    pub reloads: Mutex<Vec<DsUri>>,
}

impl RecordingHost {
    pub fn new(selection: ConflictViewSelection) -> Arc<Self> {
        Arc::new(Self {
            selection: Mutex::new(selection),
            errors: Mutex::default(),
            messages: Mutex::default(),
            statuses: Mutex::default(),
            prompts: Mutex::default(),
            diffs: Mutex::default(),
            reloads: Mutex::default(),
        })
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

#[async_trait]
impl EditorHost for RecordingHost {
    async fn reload_editor(&self, uri: &DsUri) {
        self.reloads.lock().push(uri.clone());
    }

    fn show_error(&self, message: &str) {
        self.errors.lock().push(message.to_string());
    }

    fn show_message(&self, message: &str, _timeout: Duration) {
        self.messages.lock().push(message.to_string());
    }

    fn set_status(&self, message: &str) -> dsfs_provider::StatusIndicator {
        self.statuses.lock().push(message.to_string());
        dsfs_provider::StatusIndicator::noop()
    }

    async fn prompt_conflict(&self, _uri: &DsUri, name: &str) -> ConflictViewSelection {
        self.prompts.lock().push(name.to_string());
        *self.selection.lock()
    }

    async fn open_diff(&self, remote: &DsUri, local: &DsUri, title: &str) {
        self.diffs
            .lock()
            .push((remote.clone(), local.clone(), title.to_string()));
    }
}

/// A provider wired to `mvs` and `host`, with one profile named [`PROFILE`].
pub fn provider_with(mvs: &Arc<FakeMvs>, host: Arc<RecordingHost>) -> DatasetFsProvider {
    let config = ProviderConfig::new()
        .with_fire_soon_delay(Duration::from_millis(1))
        .with_profile(Profile::new(PROFILE).with_encoding("IBM-1047").with_response_timeout(30));
    let api = Arc::clone(mvs);
    let registry = move |_profile: Arc<Profile>| -> FsResult<Arc<dyn MvsApi>> {
        Ok(Arc::clone(&api) as Arc<dyn MvsApi>)
    };
    DatasetFsProvider::from_config(config, Arc::new(registry)).with_host(host)
}

pub fn provider(mvs: &Arc<FakeMvs>) -> DatasetFsProvider {
    provider_with(mvs, RecordingHost::new(ConflictViewSelection::UserDismissed))
}

/// Install a test subscriber so `RUST_LOG` works when debugging.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
