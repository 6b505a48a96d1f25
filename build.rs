use std::env;
use std::path::PathBuf;

fn main() {
    // Get the target directory
    let out_dir = env::var("OUT_DIR").unwrap();
    let out_path = PathBuf::from(out_dir);
    let target_dir = out_path.parent().unwrap().parent().unwrap().parent().unwrap();

    // Ship the C header next to the static library
    let header_src = "include/upload_image_core.h";
    let header_dst = target_dir.join("upload_image_core.h");

    if std::path::Path::new(header_src).exists() {
        if let Err(e) = std::fs::copy(header_src, &header_dst) {
            eprintln!("Warning: Failed to copy header file: {}", e);
        }
        println!("cargo:rerun-if-changed={}", header_src);
    }

    println!("cargo:rerun-if-changed=src/ffi/");
}
