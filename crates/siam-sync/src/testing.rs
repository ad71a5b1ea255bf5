//! In-process [`RemoteCatalog`] fake with call counters and failure switches.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::client::RemoteCatalog;
use crate::error::{SyncError, SyncResult};
use siam_core::{Movement, Product};

#[derive(Default)]
pub(crate) struct FakeRemote {
    configured: AtomicBool,
    connected: AtomicBool,
    reachable: AtomicBool,
    fail_writes: AtomicBool,
    products: Mutex<BTreeMap<String, Product>>,
    movements: Mutex<Vec<Movement>>,
    gets: AtomicUsize,
    lists: AtomicUsize,
    writes: AtomicUsize,
}

impl FakeRemote {
    /// Configured and reachable.
    pub fn online() -> Arc<Self> {
        let fake = FakeRemote::default();
        fake.configured.store(true, Ordering::SeqCst);
        fake.reachable.store(true, Ordering::SeqCst);
        Arc::new(fake)
    }

    /// Placeholder credentials: `connect()` refuses.
    pub fn unconfigured() -> Arc<Self> {
        Arc::new(FakeRemote::default())
    }

    /// Configured but every request fails to connect.
    pub fn unreachable() -> Arc<Self> {
        let fake = FakeRemote::default();
        fake.configured.store(true, Ordering::SeqCst);
        Arc::new(fake)
    }

    pub fn insert(&self, product: Product) {
        self.products.lock().unwrap().insert(product.code.clone(), product);
    }

    pub fn product(&self, code: &str) -> Option<Product> {
        self.products.lock().unwrap().get(code).cloned()
    }

    pub fn movements(&self) -> Vec<Movement> {
        self.movements.lock().unwrap().clone()
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn lists(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_reachable(&self) -> SyncResult<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(SyncError::NotConfigured);
        }
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(SyncError::ConnectionFailed("fake remote is unreachable".into()));
        }
        Ok(())
    }

    fn check_write(&self) -> SyncResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SyncError::HttpStatus {
                status: 503,
                message: "UNAVAILABLE: fake write failure".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteCatalog for FakeRemote {
    fn connect(&self) -> bool {
        let configured = self.configured.load(Ordering::SeqCst);
        self.connected.store(configured, Ordering::SeqCst);
        configured
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn probe(&self) -> SyncResult<()> {
        self.check_reachable()
    }

    async fn get_by_code(&self, code: &str) -> SyncResult<Option<Product>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;
        Ok(self.product(code))
    }

    async fn list_all(&self) -> SyncResult<Vec<Product>> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;
        Ok(self.products.lock().unwrap().values().cloned().collect())
    }

    async fn create(&self, product: &Product) -> SyncResult<()> {
        self.check_write()?;
        self.products
            .lock()
            .unwrap()
            .entry(product.code.clone())
            .or_insert_with(|| product.clone());
        Ok(())
    }

    async fn update_quantity(&self, code: &str, quantity: i64) -> SyncResult<()> {
        self.check_write()?;
        match self.products.lock().unwrap().get_mut(code) {
            Some(product) => {
                product.quantity = quantity;
                Ok(())
            }
            None => Err(SyncError::HttpStatus {
                status: 404,
                message: "NOT_FOUND".into(),
            }),
        }
    }

    async fn record_movement(&self, movement: &Movement) -> SyncResult<()> {
        self.check_write()?;
        let mut movements = self.movements.lock().unwrap();
        if !movements.iter().any(|m| m.id == movement.id) {
            movements.push(movement.clone());
        }
        Ok(())
    }

    async fn delete(&self, code: &str) -> SyncResult<()> {
        self.check_write()?;
        self.products.lock().unwrap().remove(code);
        Ok(())
    }
}
