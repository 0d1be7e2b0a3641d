use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use pkgshare_lib::package::ReplicationPackage;
use pkgshare_lib::share::SharedPackageBuilder;
use pkgshare_lib::store::{FsRepository, MemoryRepository, ResourceStore};
use tempfile::TempDir;

use super::common::{StubBuilder, add_request};

const THREADS: usize = 8;
const PER_THREAD: usize = 125;

#[test]
fn concurrent_creates_mint_distinct_paths() {
  let repo = MemoryRepository::new();
  let builder = SharedPackageBuilder::new(Arc::new(StubBuilder::new()));

  let ids: Vec<String> = thread::scope(|scope| {
    let handles: Vec<_> = (0..THREADS)
      .map(|_| {
        let repo = repo.clone();
        let builder = &builder;
        scope.spawn(move || {
          let mut session = repo.session();
          (0..PER_THREAD)
            .map(|_| {
              builder
                .create(&mut session, &add_request(&["/content/a"]))
                .unwrap()
                .unwrap()
                .id()
                .to_string()
            })
            .collect::<Vec<_>>()
        })
      })
      .collect();
    handles.into_iter().flat_map(|h| h.join().unwrap()).collect()
  });

  let unique: HashSet<&String> = ids.iter().collect();
  assert_eq!(ids.len(), THREADS * PER_THREAD);
  assert_eq!(unique.len(), ids.len());

  let session = repo.session();
  let root = session.resolve("/var/sling/replication").unwrap().unwrap();
  assert_eq!(session.children(&root).unwrap().len(), THREADS * PER_THREAD);
}

#[test]
fn concurrent_creates_on_disk_all_commit() {
  let temp = TempDir::new().unwrap();
  let repo = FsRepository::open(temp.path().join("repo")).unwrap();
  let builder = SharedPackageBuilder::new(Arc::new(StubBuilder::new()));

  let ids: Vec<String> = thread::scope(|scope| {
    let handles: Vec<_> = (0..4)
      .map(|_| {
        let repo = repo.clone();
        let builder = &builder;
        scope.spawn(move || {
          let mut session = repo.session();
          (0..10)
            .map(|_| {
              builder
                .create(&mut session, &add_request(&["/content/a"]))
                .unwrap()
                .unwrap()
                .id()
                .to_string()
            })
            .collect::<Vec<_>>()
        })
      })
      .collect();
    handles.into_iter().flat_map(|h| h.join().unwrap()).collect()
  });

  let mut session = repo.session();
  for id in &ids {
    assert!(builder.fetch(&mut session, id).unwrap().is_some());
  }
  assert_eq!(ids.iter().collect::<HashSet<_>>().len(), 40);
}

#[test]
fn concurrent_holders_are_all_recorded() {
  let repo = MemoryRepository::new();
  let builder = SharedPackageBuilder::new(Arc::new(StubBuilder::new()));
  let created = builder
    .create(&mut repo.session(), &add_request(&["/content/a"]))
    .unwrap()
    .unwrap();
  let path = created.id();

  thread::scope(|scope| {
    for n in 0..THREADS {
      let repo = repo.clone();
      let builder = &builder;
      scope.spawn(move || {
        let mut session = repo.session();
        assert!(builder.acquire(&mut session, path, &format!("agent-{}", n)).unwrap());
      });
    }
  });

  let holders = builder.references(&repo.session(), path).unwrap().unwrap();
  assert_eq!(holders.len(), THREADS);
}
