//! Ring-buffered per-draw uniform storage.
//!
//! A [`FrameRing`] owns N uniform regions and a counting semaphore holding N
//! permits. Every draw takes the next region in round-robin order together with
//! a [`FramePermit`], and hands the permit to the completion handler of the
//! command buffer that reads the region. Until that handler runs the region
//! cannot be handed out again, so the CPU may prepare up to N draws ahead of
//! the GPU without overwriting memory the GPU still reads.
//!
//! Acquiring blocks the render thread when all N regions are in flight. There
//! is no timeout: a GPU that never completes stalls rendering.

use std::{
    fmt::Debug,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use anyhow::{Context, ensure};
use cgmath::Matrix4;
use futures_intrusive::sync::Semaphore;

use crate::{
    data_structures::{light::Light, uniform::UniformBlock},
    render::RenderBackend,
};

/// Number of regions per ring unless configured otherwise.
pub const DEFAULT_INFLIGHT_FRAMES: usize = 3;

#[derive(Debug, Default)]
struct Ledger {
    outstanding: usize,
    closed: bool,
}

/// The semaphore plus the explicit count of permits that are out.
struct Permits {
    semaphore: Semaphore,
    ledger: Mutex<Ledger>,
}

impl Permits {
    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take(&self) {
        self.ledger().outstanding += 1;
    }

    fn give_back(&self) {
        {
            let mut ledger = self.ledger();
            if ledger.closed || ledger.outstanding == 0 {
                return;
            }
            ledger.outstanding -= 1;
        }
        self.semaphore.release(1);
    }
}

/// Proof that one region is in flight. Returns the region to its ring exactly once.
///
/// Dropping an unreleased permit releases it, so a completion handler that is
/// discarded without being called cannot keep a region locked forever.
#[must_use = "dropping a FramePermit makes its region available again immediately"]
pub struct FramePermit {
    permits: Option<Arc<Permits>>,
    index: usize,
}

impl FramePermit {
    /// The ring index of the region this permit guards.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if let Some(permits) = self.permits.take() {
            permits.give_back();
        }
    }
}

impl Drop for FramePermit {
    fn drop(&mut self) {
        self.release_once();
    }
}

impl Debug for FramePermit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FramePermit")
            .field("index", &self.index)
            .field("released", &self.permits.is_none())
            .finish()
    }
}

/// A region handed out by [`FrameRing::acquire_next`].
#[derive(Debug)]
pub struct AcquiredRegion<'a, R> {
    pub index: usize,
    pub region: &'a R,
    pub permit: FramePermit,
}

pub struct FrameRing<R> {
    regions: Vec<R>,
    region_size: u64,
    next: usize,
    permits: Arc<Permits>,
}

impl<R> FrameRing<R> {
    /// Allocates `count` regions of `region_size` bytes through `allocate`.
    ///
    /// `allocate` receives the region index and size. Fails if `count` is zero,
    /// if a region cannot hold a [`UniformBlock`], or if any allocation fails.
    pub fn new<F>(count: usize, region_size: u64, mut allocate: F) -> anyhow::Result<Self>
    where
        F: FnMut(usize, u64) -> anyhow::Result<R>,
    {
        ensure!(count > 0, "a frame ring needs at least one region");
        ensure!(
            region_size >= UniformBlock::SIZE as u64,
            "frame ring regions of {region_size} bytes cannot hold a {} byte uniform block",
            UniformBlock::SIZE
        );
        let regions = (0..count)
            .map(|index| {
                allocate(index, region_size)
                    .with_context(|| format!("allocating frame ring region {index} of {count}"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        log::debug!("frame ring with {count} regions of {region_size} bytes");
        Ok(Self {
            regions,
            region_size,
            next: 0,
            permits: Arc::new(Permits {
                semaphore: Semaphore::new(true, count),
                ledger: Mutex::new(Ledger::default()),
            }),
        })
    }

    /// Waits for a free region and takes the next one in round-robin order.
    ///
    /// Blocks the calling thread while all regions are in flight. Returns `None`
    /// once the ring is closed.
    pub fn acquire_next(&mut self) -> Option<AcquiredRegion<'_, R>> {
        if self.is_closed() {
            return None;
        }
        futures::executor::block_on(self.permits.semaphore.acquire(1)).disarm();
        Some(self.advance())
    }

    /// Like [`FrameRing::acquire_next`] but returns `None` instead of blocking.
    ///
    /// The ring index only advances when a region is handed out.
    pub fn try_acquire_next(&mut self) -> Option<AcquiredRegion<'_, R>> {
        if self.is_closed() {
            return None;
        }
        self.permits.semaphore.try_acquire(1)?.disarm();
        Some(self.advance())
    }

    fn advance(&mut self) -> AcquiredRegion<'_, R> {
        self.permits.take();
        let index = self.next;
        self.next = (self.next + 1) % self.regions.len();
        AcquiredRegion {
            index,
            region: &self.regions[index],
            permit: FramePermit {
                permits: Some(self.permits.clone()),
                index,
            },
        }
    }

    /// Copies model-view, projection and light into `region` at offsets 0, 64 and 128.
    ///
    /// `region` is one handed out by a ring, so it holds a full [`UniformBlock`].
    pub fn write<B>(
        backend: &B,
        region: &R,
        model_view: &Matrix4<f32>,
        projection: &Matrix4<f32>,
        light: &Light,
    ) where
        B: RenderBackend<Region = R> + ?Sized,
    {
        let model_view: [[f32; 4]; 4] = (*model_view).into();
        let projection: [[f32; 4]; 4] = (*projection).into();
        backend.write_region(
            region,
            UniformBlock::MODEL_VIEW_OFFSET,
            bytemuck::bytes_of(&model_view),
        );
        backend.write_region(
            region,
            UniformBlock::PROJECTION_OFFSET,
            bytemuck::bytes_of(&projection),
        );
        backend.write_region(region, UniformBlock::LIGHT_OFFSET, bytemuck::bytes_of(light));
    }

    /// Returns every permit that is still out and stops later releases from
    /// signalling. Idempotent.
    pub fn close(&mut self) {
        let outstanding = {
            let mut ledger = self.permits.ledger();
            if ledger.closed {
                return;
            }
            ledger.closed = true;
            std::mem::take(&mut ledger.outstanding)
        };
        if outstanding > 0 {
            log::debug!("closing frame ring with {outstanding} regions still in flight");
            self.permits.semaphore.release(outstanding);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.permits.ledger().closed
    }

    /// N, the number of regions.
    pub fn inflight_count(&self) -> usize {
        self.regions.len()
    }

    /// Regions acquired whose permit has not been released yet.
    pub fn in_flight(&self) -> usize {
        self.permits.ledger().outstanding
    }

    pub fn available_permits(&self) -> usize {
        self.permits.semaphore.permits()
    }

    /// Index of the region the next acquisition will return.
    pub fn next_index(&self) -> usize {
        self.next
    }

    pub fn region(&self, index: usize) -> Option<&R> {
        self.regions.get(index)
    }

    pub fn region_size(&self) -> u64 {
        self.region_size
    }
}

impl<R> Drop for FrameRing<R> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<R> Debug for FrameRing<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameRing")
            .field("regions", &self.regions.len())
            .field("region_size", &self.region_size)
            .field("next", &self.next)
            .field("in_flight", &self.in_flight())
            .field("closed", &self.is_closed())
            .finish()
    }
}
