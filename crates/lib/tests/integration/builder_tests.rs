use std::io::Read;
use std::sync::Arc;

use pkgshare_lib::config::SharingConfig;
use pkgshare_lib::consts::{PN_ORIGINAL_ACTION, PN_ORIGINAL_ID, PN_ORIGINAL_PATHS};
use pkgshare_lib::package::{
  BuildError, BytesPackage, PackageBuilder, ReadError, ReplicationActionType, ReplicationPackage,
};
use pkgshare_lib::share::{MintedName, SharedPackageBuilder};
use pkgshare_lib::store::{MemoryRepository, ResourceStore, StoreError, Value, ValueMap, path};

use super::common::{FailingCommit, StubBuilder, add_request};

fn shared(stub: StubBuilder) -> (SharedPackageBuilder<Arc<StubBuilder>>, Arc<StubBuilder>) {
  let stub = Arc::new(stub);
  (SharedPackageBuilder::new(Arc::clone(&stub)), stub)
}

mod create {
  use super::*;

  #[test]
  fn persists_record_and_returns_proxy() {
    let repo = MemoryRepository::new();
    let mut session = repo.session();
    let (builder, _) = shared(StubBuilder::new());

    let package = builder
      .create(&mut session, &add_request(&["/content/a", "/content/b"]))
      .unwrap()
      .unwrap();

    let name = package.id().strip_prefix("/var/sling/replication/").unwrap();
    let minted = MintedName::parse(name).unwrap();
    assert_eq!(minted.prefix, "replpackage");
    assert_eq!(package.action(), ReplicationActionType::Add);
    assert_eq!(package.paths(), ["/content/a".to_string(), "/content/b".to_string()]);
    assert_eq!(package.package().id(), "pkg-1");
    assert!(!session.has_changes());

    let reader = repo.session();
    let node = reader.resolve(package.id()).unwrap().unwrap();
    let props = reader.read_properties(&node).unwrap().unwrap();
    assert_eq!(props[PN_ORIGINAL_ID], Value::from("pkg-1"));
    assert_eq!(props[PN_ORIGINAL_ACTION], Value::from("ADD"));
    assert_eq!(
      props[PN_ORIGINAL_PATHS],
      Value::from(vec!["/content/a".to_string(), "/content/b".to_string()])
    );
    assert_eq!(props["jcr:primaryType"], Value::from("nt:unstructured"));
    assert_eq!(props["sling:resourceType"], Value::from("sling:Folder"));

    let refs = reader.resolve(&path::join(package.id(), "refs")).unwrap().unwrap();
    let marker = reader.read_properties(&refs).unwrap().unwrap();
    assert_eq!(marker["sling:resourceType"], Value::from("nt:unstructured"));
  }

  #[test]
  fn payload_is_the_delegates() {
    let repo = MemoryRepository::new();
    let mut session = repo.session();
    let (builder, _) = shared(StubBuilder::new());

    let package = builder.create(&mut session, &add_request(&["/content/a"])).unwrap().unwrap();

    let mut payload = String::new();
    package.open_stream().unwrap().read_to_string(&mut payload).unwrap();
    assert_eq!(payload, "payload-1");
    assert_eq!(package.length(), 9);
    assert_eq!(package.package_type(), "stub");
  }

  #[test]
  fn each_call_mints_a_new_path() {
    let repo = MemoryRepository::new();
    let mut session = repo.session();
    let (builder, _) = shared(StubBuilder::new());

    let first = builder.create(&mut session, &add_request(&["/content/a"])).unwrap().unwrap();
    let second = builder.create(&mut session, &add_request(&["/content/a"])).unwrap().unwrap();
    assert_ne!(first.id(), second.id());
  }

  #[test]
  fn nothing_built_persists_nothing() {
    let repo = MemoryRepository::new();
    let mut session = repo.session();
    let (builder, _) = shared(StubBuilder::empty());

    assert!(builder.create(&mut session, &add_request(&["/content/a"])).unwrap().is_none());
    assert!(repo.is_empty());
    assert!(!session.has_changes());
  }

  #[test]
  fn delegate_failure_propagates() {
    let repo = MemoryRepository::new();
    let mut session = repo.session();
    let (builder, _) = shared(StubBuilder::failing());

    let err = builder.create(&mut session, &add_request(&["/content/a"])).unwrap_err();
    assert!(matches!(err, BuildError::Delegate { .. }));
    assert!(repo.is_empty());
  }

  #[test]
  fn commit_failure_is_store_error_and_leaves_nothing_behind() {
    let repo = MemoryRepository::new();
    let mut session = FailingCommit { inner: repo.session() };
    let (builder, _) = shared(StubBuilder::new());

    let err = builder.create(&mut session, &add_request(&["/content/a"])).unwrap_err();
    assert!(matches!(err, BuildError::Store(StoreError::Conflict(_))));
    assert!(!session.has_changes());
    assert!(repo.is_empty());
  }

  #[test]
  fn commit_failure_keeps_callers_staged_work() {
    let repo = MemoryRepository::new();
    let mut session = FailingCommit { inner: repo.session() };
    let (builder, _) = shared(StubBuilder::new());

    session
      .get_or_create("/content/caller-work", "nt:unstructured", "nt:unstructured", false)
      .unwrap();

    let err = builder.create(&mut session, &add_request(&["/content/a"])).unwrap_err();
    assert!(matches!(err, BuildError::Store(_)));
    assert!(session.resolve("/content/caller-work").unwrap().is_some());
    assert!(session.resolve("/var").unwrap().is_none());
  }

  #[test]
  fn commit_failure_under_existing_root_drops_only_the_record() {
    let repo = MemoryRepository::new();
    repo
      .session()
      .get_or_create("/var/sling/replication", "sling:Folder", "sling:Folder", true)
      .unwrap();
    let mut session = FailingCommit { inner: repo.session() };
    let (builder, _) = shared(StubBuilder::new());

    let root = session.resolve("/var/sling/replication").unwrap().unwrap();
    let mut props = ValueMap::new();
    props.insert("owner".to_string(), Value::from("caller"));
    session.write_properties(&root, props).unwrap();

    assert!(builder.create(&mut session, &add_request(&["/content/a"])).is_err());
    assert!(session.children(&root).unwrap().is_empty());
    let root_props = session.read_properties(&root).unwrap().unwrap();
    assert_eq!(root_props["owner"], Value::from("caller"));
  }
}

mod read {
  use super::*;

  #[test]
  fn shares_deserialized_package() {
    let repo = MemoryRepository::new();
    let mut session = repo.session();
    let (builder, _) = shared(StubBuilder::new());

    let mut stream: &[u8] = b"remote-7";
    let package = builder.read(&mut session, &mut stream).unwrap().unwrap();

    assert!(package.id().starts_with("/var/sling/replication/replpackage_"));
    assert_eq!(package.package().id(), "remote-7");
    let record = builder.record(&session, package.id()).unwrap().unwrap();
    assert_eq!(record.original_id, "remote-7");
    assert_eq!(record.original_paths, vec!["/content/read"]);
  }

  #[test]
  fn nothing_read_persists_nothing() {
    let repo = MemoryRepository::new();
    let mut session = repo.session();
    let (builder, _) = shared(StubBuilder::new());

    let mut stream: &[u8] = b"";
    assert!(builder.read(&mut session, &mut stream).unwrap().is_none());
    assert!(repo.is_empty());
  }

  #[test]
  fn delegate_error_propagates() {
    let repo = MemoryRepository::new();
    let mut session = repo.session();
    let (builder, _) = shared(StubBuilder::failing());

    let mut stream: &[u8] = b"remote-7";
    let err = builder.read(&mut session, &mut stream).unwrap_err();
    assert!(matches!(err, ReadError::Malformed { .. }));
    assert!(repo.is_empty());
  }

  #[test]
  fn commit_failure_is_store_error() {
    let repo = MemoryRepository::new();
    let mut session = FailingCommit { inner: repo.session() };
    let (builder, _) = shared(StubBuilder::new());

    let mut stream: &[u8] = b"remote-7";
    let err = builder.read(&mut session, &mut stream).unwrap_err();
    assert!(matches!(err, ReadError::Store(_)));
    assert!(repo.is_empty());
  }
}

mod fetch {
  use super::*;

  #[test]
  fn returns_same_package_under_same_path() {
    let repo = MemoryRepository::new();
    let mut session = repo.session();
    let (builder, _) = shared(StubBuilder::new());

    let created = builder.create(&mut session, &add_request(&["/content/a"])).unwrap().unwrap();

    let mut other = repo.session();
    let fetched = builder.fetch(&mut other, created.id()).unwrap().unwrap();
    assert_eq!(fetched.id(), created.id());
    assert_eq!(fetched.package().id(), "pkg-1");
    assert_eq!(fetched.paths(), created.paths());

    let again = builder.fetch(&mut other, created.id()).unwrap().unwrap();
    assert_eq!(again.id(), fetched.id());
    assert_eq!(again.package().id(), fetched.package().id());
  }

  #[test]
  fn orphaned_record_is_none() {
    let repo = MemoryRepository::new();
    let mut session = repo.session();
    let (builder, stub) = shared(StubBuilder::new());

    let created = builder.create(&mut session, &add_request(&["/content/a"])).unwrap().unwrap();
    stub.forget("pkg-1");

    assert!(builder.fetch(&mut session, created.id()).unwrap().is_none());
    assert_eq!(stub.calls.fetch_count(), 1);
  }

  #[test]
  fn unknown_paths_are_none_without_asking_delegate() {
    let repo = MemoryRepository::new();
    let mut session = repo.session();
    let (builder, stub) = shared(StubBuilder::new());

    assert!(builder.fetch(&mut session, "/content/a").unwrap().is_none());
    assert!(builder.fetch(&mut session, "pkg-1").unwrap().is_none());
    assert!(
      builder
        .fetch(&mut session, "/var/sling/replication/replpackage_1_missing")
        .unwrap()
        .is_none()
    );
    assert!(builder.fetch(&mut session, "/var/sling/replication/../x").unwrap().is_none());
    assert_eq!(stub.calls.fetch_count(), 0);
  }
}

mod install {
  use super::*;

  #[test]
  fn shared_package_is_installed_by_delegate() {
    let repo = MemoryRepository::new();
    let mut session = repo.session();
    let (builder, stub) = shared(StubBuilder::new());

    let created = builder.create(&mut session, &add_request(&["/content/a"])).unwrap().unwrap();
    assert!(builder.install(&mut session, &created).unwrap());
    assert_eq!(stub.calls.install_count(), 1);

    let fetched = builder.fetch(&mut session, created.id()).unwrap().unwrap();
    assert!(builder.install(&mut session, &fetched).unwrap());
    assert_eq!(stub.calls.install_count(), 2);
  }

  #[test]
  fn delegate_result_passes_through() {
    let repo = MemoryRepository::new();
    let mut session = repo.session();
    let (builder, stub) = shared(StubBuilder::installing(false));

    let created = builder.create(&mut session, &add_request(&["/content/a"])).unwrap().unwrap();
    assert!(!builder.install(&mut session, &created).unwrap());
    assert_eq!(stub.calls.install_count(), 1);
  }

  #[test]
  fn foreign_package_is_rejected_without_delegate_call() {
    let repo = MemoryRepository::new();
    let mut session = repo.session();
    let (builder, stub) = shared(StubBuilder::new());

    let plain = BytesPackage::new("pkg-1", ReplicationActionType::Add, Vec::new(), "stub", Vec::new());
    assert!(!builder.install(&mut session, &plain).unwrap());
    assert_eq!(stub.calls.install_count(), 0);
  }

  #[test]
  fn package_from_other_sharing_layer_is_rejected() {
    let repo = MemoryRepository::new();
    let mut session = repo.session();
    let (builder, stub) = shared(StubBuilder::new());

    let other_config = SharingConfig::new("/var/other/replication", "replpackage").unwrap();
    let other = SharedPackageBuilder::with_config(StubBuilder::new(), other_config);
    let foreign = other.create(&mut session, &add_request(&["/content/a"])).unwrap().unwrap();

    assert_ne!(builder.origin(), other.origin());
    assert!(!builder.install(&mut session, &foreign).unwrap());
    assert_eq!(stub.calls.install_count(), 0);
  }
}

mod chaining {
  use super::*;

  #[test]
  fn works_behind_a_trait_object() {
    let repo = MemoryRepository::new();
    let mut session = repo.session();
    let stub = Arc::new(StubBuilder::new());
    let builder: Box<dyn PackageBuilder> = Box::new(SharedPackageBuilder::new(Arc::clone(&stub)));

    let created = builder.create(&mut session, &add_request(&["/content/a"])).unwrap().unwrap();
    assert!(created.id().starts_with("/var/sling/replication/"));
    assert!(created.origin().is_some());

    let fetched = builder.fetch(&mut session, created.id()).unwrap().unwrap();
    assert_eq!(fetched.id(), created.id());
    assert!(builder.install(&mut session, fetched.as_ref()).unwrap());
    assert_eq!(stub.calls.install_count(), 1);
  }

  #[test]
  fn nested_sharing_layers_each_keep_a_record() {
    let repo = MemoryRepository::new();
    let mut session = repo.session();
    let inner_config = SharingConfig::new("/var/inner", "inner").unwrap();
    let inner = SharedPackageBuilder::with_config(StubBuilder::new(), inner_config);
    let outer = SharedPackageBuilder::new(inner);

    let created = outer.create(&mut session, &add_request(&["/content/a"])).unwrap().unwrap();
    let inner_path = created.package().id().to_string();
    assert!(inner_path.starts_with("/var/inner/inner_"));

    let outer_record = outer.record(&session, created.id()).unwrap().unwrap();
    assert_eq!(outer_record.original_id, inner_path);

    let fetched = outer.fetch(&mut session, created.id()).unwrap().unwrap();
    assert_eq!(fetched.package().id(), inner_path);
    assert!(outer.install(&mut session, &fetched).unwrap());
  }
}
