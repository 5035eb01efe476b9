//! Decomposed per-bone transforms

/// Position, rotation and scale streams for every bone of a skeleton
///
/// Slot `i` of each stream belongs to bone `i`: `pos[3i..3i+3]`,
/// `rot[4i..4i+4]`, `scl[3i..3i+3]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pose {
    pub pos: Vec<f32>,
    pub rot: Vec<f32>,
    pub scl: Vec<f32>,
}

impl Pose {
    /// Pose with identity transforms for `bone_count` bones
    pub fn new(bone_count: usize) -> Self {
        let mut pose = Self::default();
        pose.resize(bone_count);
        pose
    }

    pub fn bone_count(&self) -> usize {
        self.pos.len() / 3
    }

    /// Resize the streams; new slots hold identity transforms
    pub fn resize(&mut self, bone_count: usize) {
        self.pos.resize(bone_count * 3, 0.0);
        let old = self.rot.len() / 4;
        self.rot.resize(bone_count * 4, 0.0);
        for slot in old..bone_count {
            self.rot[slot * 4 + 3] = 1.0;
        }
        self.scl.resize(bone_count * 3, 1.0);
    }

    pub fn position(&self, bone: usize) -> [f32; 3] {
        [self.pos[bone * 3], self.pos[bone * 3 + 1], self.pos[bone * 3 + 2]]
    }

    pub fn rotation(&self, bone: usize) -> [f32; 4] {
        [
            self.rot[bone * 4],
            self.rot[bone * 4 + 1],
            self.rot[bone * 4 + 2],
            self.rot[bone * 4 + 3],
        ]
    }

    pub fn scale(&self, bone: usize) -> [f32; 3] {
        [self.scl[bone * 3], self.scl[bone * 3 + 1], self.scl[bone * 3 + 2]]
    }
}

/// Stack-discipline pool of temporary poses
///
/// [`push`](Self::push) hands out a pose sized for the requested bone count,
/// growing the pool on demand; [`pop`](Self::pop) gives it back. Buffers are
/// kept for reuse and the pool never shrinks.
#[derive(Debug, Default)]
pub struct PoseStack {
    pool: Vec<Pose>,
    cursor: usize,
}

impl PoseStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the next pose off the pool
    ///
    /// Its contents are whatever the previous user left; callers overwrite it.
    pub fn push(&mut self, bone_count: usize) -> Pose {
        if self.cursor == self.pool.len() {
            self.pool.push(Pose::new(bone_count));
        }
        let mut pose = std::mem::take(&mut self.pool[self.cursor]);
        if pose.bone_count() != bone_count {
            pose.resize(bone_count);
        }
        self.cursor += 1;
        pose
    }

    /// Return the most recently pushed pose
    ///
    /// A pop without a matching push adds the pose to the pool for reuse.
    pub fn pop(&mut self, pose: Pose) {
        if self.cursor == 0 {
            self.pool.push(pose);
            return;
        }
        self.cursor -= 1;
        self.pool[self.cursor] = pose;
    }

    /// Number of poses currently handed out
    pub fn depth(&self) -> usize {
        self.cursor
    }

    /// Number of poses ever allocated
    pub fn capacity(&self) -> usize {
        self.pool.len()
    }
}
