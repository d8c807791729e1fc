use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, ReentrantMutex, RwLock};
use slab::Slab;

use super::ScopeId;
use super::disposal::DisposalList;
use super::singleton::SingletonCache;

/// One scope in the arena.
pub(crate) struct ScopeNode {
	pub(crate) id: ScopeId,
	pub(crate) parent: Option<ScopeId>,
	pub(crate) name: Option<Arc<str>>,
	pub(crate) singletons: SingletonCache,
	pub(crate) disposal: Arc<DisposalList>,
	children: Mutex<Vec<ScopeId>>,
	disposed: AtomicBool,
	/// Serializes resolution of types this scope has not seen yet.
	activation: ReentrantMutex<()>,
}

impl ScopeNode {
	fn new(id: ScopeId, parent: Option<ScopeId>, name: Option<Arc<str>>) -> Self {
		Self {
			id,
			parent,
			name,
			singletons: SingletonCache::default(),
			disposal: Arc::new(DisposalList::default()),
			children: Mutex::new(Vec::new()),
			disposed: AtomicBool::new(false),
			activation: ReentrantMutex::new(()),
		}
	}

	pub(crate) fn is_disposed(&self) -> bool {
		self.disposed.load(Ordering::Acquire)
	}

	/// Marks the node disposed; returns false if it already was.
	pub(crate) fn mark_disposed(&self) -> bool {
		!self.disposed.swap(true, Ordering::AcqRel)
	}

	pub(crate) fn activation_lock(&self) -> &ReentrantMutex<()> {
		&self.activation
	}

	pub(crate) fn add_child(&self, child: ScopeId) {
		self.children.lock().push(child);
	}

	pub(crate) fn remove_child(&self, child: ScopeId) {
		self.children.lock().retain(|c| *c != child);
	}

	pub(crate) fn take_children(&self) -> Vec<ScopeId> {
		std::mem::take(&mut *self.children.lock())
	}

	pub(crate) fn child_count(&self) -> usize {
		self.children.lock().len()
	}
}

/// Arena of live scope nodes.
#[derive(Default)]
pub(crate) struct ScopeArena {
	nodes: RwLock<Slab<Arc<ScopeNode>>>,
}

impl ScopeArena {
	pub(crate) fn insert(&self, parent: Option<ScopeId>, name: Option<Arc<str>>) -> Arc<ScopeNode> {
		let mut nodes = self.nodes.write();
		let entry = nodes.vacant_entry();
		let node = Arc::new(ScopeNode::new(ScopeId(entry.key()), parent, name));
		entry.insert(Arc::clone(&node));
		node
	}

	pub(crate) fn get(&self, id: ScopeId) -> Option<Arc<ScopeNode>> {
		self.nodes.read().get(id.0).cloned()
	}

	pub(crate) fn remove(&self, id: ScopeId) -> Option<Arc<ScopeNode>> {
		self.nodes.write().try_remove(id.0)
	}

	pub(crate) fn len(&self) -> usize {
		self.nodes.read().len()
	}
}
