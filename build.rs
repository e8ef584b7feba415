use std::{env, fs, path::PathBuf};

fn main() {
    // Rebuild if assembly or the memory map changes
    println!("cargo:rerun-if-changed=trap.S");
    println!("cargo:rerun-if-changed=memory.x");

    // Host builds (unit tests) never link the trap entry code.
    if env::var("CARGO_CFG_TARGET_ARCH").as_deref() != Ok("riscv64") {
        return;
    }

    // Compile trap.S with Zicsr enabled
    cc::Build::new()
        .file("trap.S")
        .flag("-march=rv64imac_zicsr")
        .flag("-mabi=lp64")
        .compile("trap");

    // riscv-rt's link.x includes memory.x from the search path
    let out = PathBuf::from(env::var_os("OUT_DIR").unwrap());
    fs::write(out.join("memory.x"), include_bytes!("memory.x")).unwrap();
    println!("cargo:rustc-link-search={}", out.display());
}
