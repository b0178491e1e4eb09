use std::{
    collections::VecDeque,
    ops::Range,
    sync::{Mutex, MutexGuard},
};

use trapeze::render::{CompletionHandler, DrawPass, RenderBackend};

/// A render pass as the recording backend saw it at submission.
#[derive(Debug, Clone)]
pub struct RecordedPass {
    pub label: String,
    pub pipeline: &'static str,
    pub target: u32,
    pub clear_colour: wgpu::Color,
    pub cull_mode: Option<wgpu::Face>,
    pub vertex_buffer: usize,
    pub region: usize,
    /// Contents of the uniform region when the pass was submitted.
    pub region_bytes: Vec<u8>,
    pub material: Option<&'static str>,
    pub vertices: Range<u32>,
    pub instances: Range<u32>,
    pub present: bool,
}

#[derive(Default)]
pub struct Recording {
    pub vertex_buffers: Vec<(String, Vec<u8>)>,
    pub regions: Vec<(String, Vec<u8>)>,
    pub passes: Vec<RecordedPass>,
    pending: VecDeque<CompletionHandler>,
}

/// A CPU stand-in for the GPU: buffers are byte vectors, passes are recorded,
/// and completion handlers wait until the test "finishes" the GPU work.
#[derive(Default)]
pub struct RecordingBackend {
    recording: Mutex<Recording>,
    /// Makes `create_uniform_region` fail for this region index.
    pub fail_region: Option<usize>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_at(region: usize) -> Self {
        Self {
            fail_region: Some(region),
            ..Self::default()
        }
    }

    pub fn recording(&self) -> MutexGuard<'_, Recording> {
        self.recording.lock().unwrap()
    }

    pub fn region_bytes(&self, region: usize) -> Vec<u8> {
        self.recording().regions[region].1.clone()
    }

    pub fn passes(&self) -> Vec<RecordedPass> {
        self.recording().passes.clone()
    }

    /// Submitted passes whose completion handler has not run yet.
    pub fn pending(&self) -> usize {
        self.recording().pending.len()
    }

    /// Completes the oldest submission. Returns false if nothing was pending.
    pub fn complete_next(&self) -> bool {
        // run the handler without holding the lock
        let handler = self.recording().pending.pop_front();
        match handler {
            Some(handler) => {
                handler();
                true
            }
            None => false,
        }
    }

    pub fn complete_all(&self) -> usize {
        let mut completed = 0;
        while self.complete_next() {
            completed += 1;
        }
        completed
    }

    /// Throws the pending handlers away without calling them.
    pub fn drop_pending(&self) -> usize {
        let dropped: Vec<_> = self.recording().pending.drain(..).collect();
        dropped.len()
    }
}

impl RenderBackend for RecordingBackend {
    type Buffer = usize;
    type Region = usize;
    type Material = &'static str;
    type Pipeline = &'static str;
    type Target = u32;

    fn create_vertex_buffer(&self, label: &str, contents: &[u8]) -> anyhow::Result<usize> {
        let mut recording = self.recording();
        recording
            .vertex_buffers
            .push((label.to_string(), contents.to_vec()));
        Ok(recording.vertex_buffers.len() - 1)
    }

    fn create_uniform_region(&self, label: &str, size: u64) -> anyhow::Result<usize> {
        let mut recording = self.recording();
        let index = recording.regions.len();
        if self.fail_region == Some(index) {
            anyhow::bail!("out of memory for {label}");
        }
        recording
            .regions
            .push((label.to_string(), vec![0; size as usize]));
        Ok(index)
    }

    fn write_region(&self, region: &usize, offset: u64, bytes: &[u8]) {
        let mut recording = self.recording();
        let offset = offset as usize;
        recording.regions[*region].1[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    fn submit(&self, pass: DrawPass<'_, Self>, target: &u32, on_completed: CompletionHandler) {
        let mut recording = self.recording();
        let region_bytes = recording.regions[*pass.uniforms].1.clone();
        recording.passes.push(RecordedPass {
            label: pass.label.to_string(),
            pipeline: *pass.pipeline,
            target: *target,
            clear_colour: pass.clear_colour,
            cull_mode: pass.cull_mode,
            vertex_buffer: *pass.vertex_buffer,
            region: *pass.uniforms,
            region_bytes,
            material: pass.material.copied(),
            vertices: pass.vertices,
            instances: pass.instances,
            present: pass.present,
        });
        recording.pending.push_back(on_completed);
    }
}

/// Reads native-endian f32 values out of region bytes.
pub fn floats(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}
