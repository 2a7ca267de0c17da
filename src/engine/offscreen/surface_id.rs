//! ### English
//! Local surface ids: versioned names for a surface's content generation.
//!
//! ### 中文
//! 本地 surface id：表示 surface 内容代次的版本化名称。

/// ### English
/// A surface-scoped id. Valid only when every component is non-zero.
///
/// The parent sequence advances when the embedding side allocates (resize, eviction); the child
/// sequence advances when the renderer reports its own updates.
///
/// ### 中文
/// surface 作用域内的 id。仅当所有分量都非零时有效。
///
/// 嵌入方分配（resize、驱逐）时推进 parent 序号；渲染器上报自身更新时推进 child 序号。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct LocalSurfaceId {
    pub parent_sequence: u32,
    pub child_sequence: u32,
    pub embed_token: u64,
}

impl LocalSurfaceId {
    pub const INVALID: Self = Self {
        parent_sequence: 0,
        child_sequence: 0,
        embed_token: 0,
    };

    pub fn is_valid(&self) -> bool {
        self.parent_sequence != 0 && self.child_sequence != 0 && self.embed_token != 0
    }
}

/// ### English
/// Parent-side allocator for one surface.
///
/// Nothing is allocated until the first [`Self::get_or_create`] / [`Self::generate_id`].
/// [`Self::invalidate`] evicts the current id; only a new generation makes it valid again.
///
/// ### 中文
/// 单个 surface 的 parent 侧分配器。
///
/// 在首次 [`Self::get_or_create`] / [`Self::generate_id`] 之前不会分配。[`Self::invalidate`] 会驱逐当前 id；
/// 只有生成新 id 才能使其重新有效。
#[derive(Debug)]
pub struct LocalSurfaceIdAllocator {
    current: Option<LocalSurfaceId>,
    invalid: bool,
    next_embed_token: u64,
    generations: u64,
}

impl Default for LocalSurfaceIdAllocator {
    fn default() -> Self {
        Self {
            current: None,
            invalid: false,
            next_embed_token: 1,
            generations: 0,
        }
    }
}

impl LocalSurfaceIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// ### English
    /// Allocates a new parent sequence (the first allocation also mints an embed token).
    ///
    /// ### 中文
    /// 分配新的 parent 序号（首次分配还会生成 embed token）。
    pub fn generate_id(&mut self) -> LocalSurfaceId {
        let next = match self.current {
            Some(current) => LocalSurfaceId {
                parent_sequence: current.parent_sequence.wrapping_add(1).max(1),
                ..current
            },
            None => {
                let embed_token = self.next_embed_token;
                self.next_embed_token += 1;
                LocalSurfaceId {
                    parent_sequence: 1,
                    child_sequence: 1,
                    embed_token,
                }
            }
        };
        self.current = Some(next);
        self.invalid = false;
        self.generations += 1;
        tracing::trace!(?next, "local surface id generated");
        next
    }

    /// ### English
    /// Current id; [`LocalSurfaceId::INVALID`] if never allocated or evicted.
    ///
    /// ### 中文
    /// 当前 id；若从未分配或已被驱逐则为 [`LocalSurfaceId::INVALID`]。
    pub fn current(&self) -> LocalSurfaceId {
        match self.current {
            Some(id) if !self.invalid => id,
            _ => LocalSurfaceId::INVALID,
        }
    }

    pub fn get_or_create(&mut self) -> LocalSurfaceId {
        if self.current.is_none() {
            self.generate_id();
        }
        self.current()
    }

    pub fn invalidate(&mut self) {
        if self.current.is_some() {
            self.invalid = true;
        }
    }

    /// ### English
    /// Adopts a newer child sequence reported by the renderer for the same parent generation.
    /// Does not revive an evicted id. Returns whether the id changed.
    ///
    /// ### 中文
    /// 采纳渲染器针对同一 parent 代次上报的更新的 child 序号。不会复活已驱逐的 id。返回 id 是否变化。
    pub fn update_from_child(&mut self, child: LocalSurfaceId) -> bool {
        let Some(current) = self.current.as_mut() else {
            return false;
        };
        if !child.is_valid()
            || child.embed_token != current.embed_token
            || child.parent_sequence != current.parent_sequence
            || child.child_sequence <= current.child_sequence
        {
            return false;
        }
        current.child_sequence = child.child_sequence;
        true
    }

    /// ### English
    /// Number of ids generated so far.
    ///
    /// ### 中文
    /// 迄今为止生成的 id 数量。
    pub fn generation_count(&self) -> u64 {
        self.generations
    }
}
