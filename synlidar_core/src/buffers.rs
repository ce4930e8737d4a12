// synlidar_core/src/buffers.rs

use bytemuck::{Pod, Zeroable};
use tracing::warn;

use crate::types::EntityId;

/// Floats per output point: `[x, y, z, ch0, ch1, ch2, ch3]`.
pub const FLOATS_PER_POINT: usize = 7;

/// Identity written into adjusted ray-cast points.
pub const ADJUSTED_POINT_SENTINEL: f32 = 65535.0;

/// One output point. Position is in the output frame (forward = +x, left = +y,
/// up = +z); channel meaning depends on the buffer that holds the record.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct PointRecord {
    pub position: [f32; 3],
    pub channels: [f32; 4],
}

impl PointRecord {
    pub fn new(position: [f32; 3], channels: [f32; 4]) -> Self {
        Self { position, channels }
    }

    /// Position plus an entity identity in `ch0`, remaining channels zero.
    pub fn with_entity(position: [f32; 3], entity: EntityId) -> Self {
        Self::new(position, [entity.as_channel(), 0.0, 0.0, 0.0])
    }

    /// Position plus a single auxiliary value in `ch0`.
    pub fn with_value(position: [f32; 3], value: f32) -> Self {
        Self::new(position, [value, 0.0, 0.0, 0.0])
    }

    pub fn entity(&self) -> f32 {
        self.channels[0]
    }

    pub fn class_intensity(&self) -> f32 {
        self.channels[1]
    }

    pub fn zero_intensity(&self) -> f32 {
        self.channels[2]
    }

    pub fn velocity(&self) -> f32 {
        self.channels[3]
    }

    /// Distance of the point from the sensor origin.
    pub fn range(&self) -> f32 {
        let [x, y, z] = self.position;
        (x * x + y * y + z * z).sqrt()
    }
}

/// Capacity-bounded point buffer reused across scans.
///
/// Storage is allocated once. Pushing into a full buffer drops the record and
/// logs a warning the first time it happens in a scan.
#[derive(Debug, Clone)]
pub struct PointBuffer {
    name: &'static str,
    records: Vec<PointRecord>,
    capacity: usize,
    dropped: usize,
}

impl PointBuffer {
    pub fn new(name: &'static str, capacity: usize) -> Self {
        Self {
            name,
            records: Vec::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    /// Appends a record. Returns `false` if the buffer was full.
    pub fn push(&mut self, record: PointRecord) -> bool {
        if self.records.len() >= self.capacity {
            if self.dropped == 0 {
                warn!(
                    buffer = self.name,
                    capacity = self.capacity,
                    "Maximum number of points reached, further points are dropped"
                );
            }
            self.dropped += 1;
            return false;
        }
        self.records.push(record);
        true
    }

    /// Logical reset. The allocation is kept.
    pub fn clear(&mut self) {
        self.records.clear();
        self.dropped = 0;
    }

    pub fn records(&self) -> &[PointRecord] {
        &self.records
    }

    /// Flat `[x, y, z, ch0, ch1, ch2, ch3, ...]` view of the buffer.
    pub fn as_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.records)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Records dropped since the last [`PointBuffer::clear`].
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}
