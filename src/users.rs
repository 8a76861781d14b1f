//! uid to user name resolution with a per-run cache.

use ahash::AHashMap as HashMap;
use std::ffi::CStr;

/// Looks a uid up in the password database.
pub type Resolver = fn(u32) -> Option<String>;

/// Cached user names; unknown uids render as their number.
pub struct UserNames {
    cache: HashMap<u32, String>,
    resolver: Resolver,
}

impl UserNames {
    /// Resolves through the system password database.
    pub fn system() -> Self {
        Self::with_resolver(lookup_passwd)
    }

    pub fn with_resolver(resolver: Resolver) -> Self {
        Self {
            cache: HashMap::new(),
            resolver,
        }
    }

    pub fn name(&mut self, uid: u32) -> &str {
        let resolver = self.resolver;
        self.cache
            .entry(uid)
            .or_insert_with(|| resolver(uid).unwrap_or_else(|| uid.to_string()))
    }
}

/// getpwuid_r lookup, growing the scratch buffer on ERANGE.
pub fn lookup_passwd(uid: u32) -> Option<String> {
    let mut buf_len = 1024usize;
    loop {
        let mut buf = vec![0 as libc::c_char; buf_len];
        // SAFETY: passwd is plain old data; getpwuid_r fills it in.
        let mut pwd: libc::passwd = unsafe { std::mem::zeroed() };
        let mut result: *mut libc::passwd = std::ptr::null_mut();

        // SAFETY: all pointers reference live, correctly sized storage.
        let rc = unsafe {
            libc::getpwuid_r(
                uid as libc::uid_t,
                &mut pwd,
                buf.as_mut_ptr(),
                buf.len(),
                &mut result,
            )
        };

        if rc == libc::ERANGE && buf_len < 1 << 20 {
            buf_len *= 2;
            continue;
        }
        if rc != 0 || result.is_null() || pwd.pw_name.is_null() {
            return None;
        }

        // SAFETY: pw_name points into `buf`, NUL-terminated by libc.
        let name = unsafe { CStr::from_ptr(pwd.pw_name) };
        return Some(name.to_string_lossy().into_owned());
    }
}
