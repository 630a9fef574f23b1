//! Real-time scheduling helpers (Linux SCHED_FIFO + mlockall).
//!
//! Every step is best effort: failures are logged and the round runs anyway.

use crate::cli::RtLock;

#[cfg(target_os = "linux")]
pub fn setup_rt_once(prio: Option<i32>, lock: RtLock) {
    use std::sync::OnceLock;
    static RT_ONCE: OnceLock<()> = OnceLock::new();

    RT_ONCE.get_or_init(|| {
        match lock_memory(lock) {
            Ok(()) => tracing::info!(mode = ?lock, "rt: memory lock applied"),
            Err(e) => tracing::warn!(error = %e, mode = ?lock, "rt: mlockall failed"),
        }
        match set_fifo_priority(prio) {
            Ok(applied) => tracing::info!(prio = applied, "rt: SCHED_FIFO applied"),
            Err(e) => tracing::warn!(error = %e, ?prio, "rt: sched_setscheduler failed"),
        }
    });
}

#[cfg(not(target_os = "linux"))]
pub fn setup_rt_once(prio: Option<i32>, lock: RtLock) {
    tracing::warn!(?prio, mode = ?lock, "rt: real-time mode is only supported on Linux");
}

#[cfg(target_os = "linux")]
fn lock_memory(lock: RtLock) -> eyre::Result<()> {
    let flags = match lock {
        RtLock::None => return Ok(()),
        RtLock::Current => libc::MCL_CURRENT,
        RtLock::All => libc::MCL_CURRENT | libc::MCL_FUTURE,
    };
    // SAFETY: mlockall takes no pointers and only affects this process.
    let rc = unsafe { libc::mlockall(flags) };
    if rc == 0 {
        return Ok(());
    }
    let err = std::io::Error::last_os_error();
    let retryable = matches!(err.raw_os_error(), Some(code) if code == libc::EPERM || code == libc::ENOMEM);
    let mut msg = format!("mlockall: {err}");
    if retryable {
        if let Some(limit) = memlock_limit_kib() {
            msg.push_str(&format!("; memlock limit: {limit}"));
        }
        msg.push_str("; hint: needs CAP_IPC_LOCK (or root) and sufficient 'ulimit -l'");
    }
    Err(eyre::eyre!(msg))
}

#[cfg(target_os = "linux")]
fn memlock_limit_kib() -> Option<String> {
    let mut rlim = std::mem::MaybeUninit::<libc::rlimit>::uninit();
    // SAFETY: getrlimit writes a full rlimit into the pointer on success.
    let rc = unsafe { libc::getrlimit(libc::RLIMIT_MEMLOCK, rlim.as_mut_ptr()) };
    if rc != 0 {
        return None;
    }
    // SAFETY: rc == 0 means the struct was initialized.
    let cur = unsafe { rlim.assume_init() }.rlim_cur;
    Some(if cur == libc::RLIM_INFINITY {
        "unlimited".to_string()
    } else {
        format!("{} KiB", cur / 1024)
    })
}

/// Switch the process to SCHED_FIFO. Returns the priority actually used,
/// clamped to the system range.
#[cfg(target_os = "linux")]
fn set_fifo_priority(prio: Option<i32>) -> eyre::Result<i32> {
    // SAFETY: plain integer queries.
    let (min, max) = unsafe {
        (
            libc::sched_get_priority_min(libc::SCHED_FIFO),
            libc::sched_get_priority_max(libc::SCHED_FIFO),
        )
    };
    let (min, max) = if min < 0 || max < 0 { (1, 99) } else { (min, max) };
    let wanted = prio.unwrap_or(max).clamp(min, max);
    let param = libc::sched_param {
        sched_priority: wanted,
    };
    // SAFETY: `param` outlives the call; pid 0 is this process.
    let rc = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EPERM) {
            eyre::bail!(
                "{err}; needs CAP_SYS_NICE or root (try 'sudo setcap cap_sys_nice=ep /path/to/sumo')"
            );
        }
        return Err(eyre::eyre!(err));
    }
    Ok(wanted)
}
