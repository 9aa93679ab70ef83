//! C ABI over a single process-wide [`PhysicsWorld`].
//!
//! The host installs its scene callbacks once with [`setPhysicsHost`], then drives the world
//! with the exported functions. The world is created lazily by any call that needs it and
//! lives until [`releasePhysics`]. Every call locks the instance, so concurrent calls from
//! different threads are serialized.

pub mod host;

use std::{
    ffi::CStr,
    os::raw::{c_char, c_int},
    sync::{Mutex, MutexGuard, PoisonError},
};

use scene_physics::{PhysicsSettings, PhysicsWorld};

pub use host::{FfiScene, HostCallbacks};

static PHYSICS: Mutex<Option<PhysicsWorld>> = Mutex::new(None);
static HOST: Mutex<Option<HostCallbacks>> = Mutex::new(None);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Run `f` on the process-wide world, creating it with default settings if needed.
pub fn with_physics<R>(f: impl FnOnce(&mut PhysicsWorld) -> R) -> R {
    let mut world = lock(&PHYSICS);
    f(world.get_or_insert_with(PhysicsWorld::default))
}

/// Is there a live world right now?
pub fn is_initialized() -> bool {
    lock(&PHYSICS).is_some()
}

fn host_scene() -> Option<FfiScene> {
    let callbacks = *lock(&HOST);
    if callbacks.is_none() {
        log::debug!("No physics host installed");
    }
    callbacks.map(FfiScene::new)
}

/// Copy a host string. Null pointers and invalid UTF-8 yield `None`.
///
/// # Safety
/// `text` must be null or point to a NUL-terminated string.
unsafe fn host_str(text: *const c_char) -> Option<String> {
    if text.is_null() {
        return None;
    }
    // SAFETY: non-null and NUL-terminated per the caller's contract.
    let text = unsafe { CStr::from_ptr(text) };
    text.to_str().ok().map(str::to_owned)
}

/// Install the scene callback table. Passing null uninstalls it.
///
/// # Safety
/// `callbacks` must be null or point to a valid [`HostCallbacks`]; the table is copied.
#[no_mangle]
#[allow(non_snake_case)]
pub unsafe extern "C" fn setPhysicsHost(callbacks: *const HostCallbacks) {
    // SAFETY: null or valid per the caller's contract.
    *lock(&HOST) = unsafe { callbacks.as_ref() }.copied();
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "C" fn initPhysics() {
    with_physics(|_| ());
}

/// Replace the world with one configured from a TOML document.
///
/// Returns `false` and keeps the current world if the settings do not parse.
///
/// # Safety
/// `settings` must be null or point to a NUL-terminated string.
#[no_mangle]
#[allow(non_snake_case)]
pub unsafe extern "C" fn initPhysicsWithSettings(settings: *const c_char) -> bool {
    // SAFETY: forwarded caller contract.
    let Some(text) = (unsafe { host_str(settings) }) else {
        return false;
    };
    match PhysicsSettings::from_toml_str(&text) {
        Ok(settings) => {
            *lock(&PHYSICS) = Some(PhysicsWorld::new(settings));
            true
        }
        Err(e) => {
            log::warn!("Rejected physics settings: {e}");
            false
        }
    }
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "C" fn releasePhysics() {
    let world = lock(&PHYSICS).take();
    drop(world);
}

/// Step by the elapsed wall time and write dynamic node transforms back to the host.
#[no_mangle]
#[allow(non_snake_case)]
pub extern "C" fn updatePhysics() {
    let Some(mut scene) = host_scene() else {
        return;
    };
    with_physics(|world| world.render(&mut scene));
}

#[no_mangle]
pub extern "C" fn reset() {
    with_physics(PhysicsWorld::reset);
}

/// Create a physics node for `host_node` from its attachment markup.
///
/// Markup that is not a physics attachment is ignored.
///
/// # Safety
/// `markup` must be null or point to a NUL-terminated string.
#[no_mangle]
#[allow(non_snake_case)]
pub unsafe extern "C" fn createPhysicsNode(markup: *const c_char, host_node: c_int) {
    // SAFETY: forwarded caller contract.
    let Some(markup) = (unsafe { host_str(markup) }) else {
        return;
    };
    let Some(scene) = host_scene() else {
        return;
    };
    with_physics(|world| world.create_physics_node(&scene, host_node, &markup));
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "C" fn removePhysicsNode(host_node: c_int) {
    with_physics(|world| world.remove_physics_node(host_node));
}
