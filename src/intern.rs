//! Interning caches (spec §4.4).
//!
//! Two caches, both `std::sync::Mutex`-guarded `HashMap`s in the style of
//! `StatementCache` in the pgorm driver this crate's stack was drawn
//! alongside: a capacity-bounded one for `raw()`, evicted by a generation
//! counter standing in for true LRU recency, and an unbounded one for the
//! template composer's single-literal fast path (bounded naturally by the
//! number of distinct call sites in the program, not by request volume).

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use crate::node::{Fragment, Kind};

const RAW_CACHE_CAPACITY: usize = 10_000;

struct RawCacheInner {
    capacity: usize,
    map: HashMap<String, (Fragment, u64)>,
    generation: u64,
}

static RAW_CACHE: OnceLock<Mutex<RawCacheInner>> = OnceLock::new();
static SIMPLE_TEMPLATE_CACHE: OnceLock<Mutex<HashMap<String, Fragment>>> = OnceLock::new();

fn raw_cache() -> &'static Mutex<RawCacheInner> {
    RAW_CACHE.get_or_init(|| {
        Mutex::new(RawCacheInner {
            capacity: RAW_CACHE_CAPACITY,
            map: HashMap::new(),
            generation: 0,
        })
    })
}

/// Returns an interned `Raw` fragment for `text`, minting one on first use.
/// Shared by the public `raw()` constructor and every internal call site
/// that needs framework-generated text (separators, punctuation) without
/// tripping `raw()`'s one-shot warning.
pub(crate) fn raw_interned(text: &str) -> Fragment {
    let mut cache = raw_cache().lock().unwrap_or_else(|e| e.into_inner());
    cache.generation += 1;
    let generation = cache.generation;

    if let Some((frag, last_access)) = cache.map.get_mut(text) {
        *last_access = generation;
        return frag.clone();
    }

    let frag = Fragment::new(Kind::Raw(text.to_string()));
    cache.map.insert(text.to_string(), (frag.clone(), generation));

    if cache.map.len() > cache.capacity {
        if let Some(oldest) = cache
            .map
            .iter()
            .min_by_key(|(_, (_, last))| *last)
            .map(|(key, _)| key.clone())
        {
            cache.map.remove(&oldest);
        }
    }

    frag
}

/// Looks up (or builds and caches) the `Raw` fragment for a single-piece
/// template literal with no interpolations.
pub(crate) fn simple_template(text: &str) -> Fragment {
    let cache = SIMPLE_TEMPLATE_CACHE.get_or_init(|| Mutex::new(HashMap::new()));
    let mut guard = cache.lock().unwrap_or_else(|e| e.into_inner());
    guard
        .entry(text.to_string())
        .or_insert_with(|| Fragment::new(Kind::Raw(text.to_string())))
        .clone()
}

pub fn blank() -> Fragment {
    static BLANK: OnceLock<Fragment> = OnceLock::new();
    BLANK
        .get_or_init(|| Fragment::new(Kind::Query(Vec::new())))
        .clone()
}

pub fn sql_true() -> Fragment {
    static TRUE_FRAGMENT: OnceLock<Fragment> = OnceLock::new();
    TRUE_FRAGMENT
        .get_or_init(|| Fragment::new(Kind::Raw("TRUE".to_string())))
        .clone()
}

pub fn sql_false() -> Fragment {
    static FALSE_FRAGMENT: OnceLock<Fragment> = OnceLock::new();
    FALSE_FRAGMENT
        .get_or_init(|| Fragment::new(Kind::Raw("FALSE".to_string())))
        .clone()
}

pub fn sql_null() -> Fragment {
    static NULL_FRAGMENT: OnceLock<Fragment> = OnceLock::new();
    NULL_FRAGMENT
        .get_or_init(|| Fragment::new(Kind::Raw("NULL".to_string())))
        .clone()
}
