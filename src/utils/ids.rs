// SPDX-License-Identifier: GPL-3.0-only

macro_rules! id_gen {
    ($fn_name:ident, $static_name:ident) => {
        static $static_name: std::sync::atomic::AtomicUsize =
            std::sync::atomic::AtomicUsize::new(0);

        pub(crate) fn $fn_name() -> usize {
            $static_name.fetch_add(1, std::sync::atomic::Ordering::Relaxed)
        }
    };
}

pub(crate) use id_gen;
