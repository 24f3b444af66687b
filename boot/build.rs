fn main() {
    use std::{env, fs, path::PathBuf};

    let out = PathBuf::from(env::var_os("OUT_DIR").unwrap());
    fs::write(out.join("memory.x"), MEMORY).unwrap();
    fs::write(out.join("ipl.rs"), default_ipl()).unwrap();
    println!("cargo:rustc-link-search={}", out.display());
    println!("cargo:rustc-link-arg=-Tlink.x");
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=IPL");
    println!("cargo:rerun-if-env-changed=LOG");
}

/// 前 512 KiB 放固件，之后是外部载荷区。
const MEMORY: &[u8] = b"
MEMORY {
    BOOT2 : ORIGIN = 0x10000000, LENGTH = 0x100
    FLASH : ORIGIN = 0x10000100, LENGTH = 512K - 0x100
    RAM   : ORIGIN = 0x20000000, LENGTH = 256K
}
EXTERN(BOOT2_FIRMWARE)
SECTIONS {
    .boot2 ORIGIN(BOOT2) : {
        KEEP(*(.boot2));
    } > BOOT2
} INSERT BEFORE .text;
";

/// 默认载荷：`IPL` 指向的扰码文件按大端拼成字，没有就是 1 KiB 的零。
fn default_ipl() -> String {
    use std::{fmt::Write, fs};

    let bytes = match std::env::var("IPL") {
        Ok(path) => {
            println!("cargo:rerun-if-changed={path}");
            let bytes = fs::read(&path).unwrap();
            assert!(
                !bytes.is_empty() && bytes.len() % 1024 == 0,
                "{path}: {} bytes is not a whole number of KiB",
                bytes.len()
            );
            bytes
        }
        Err(_) => {
            println!("cargo:warning=IPL is not set, the default payload is blank");
            vec![0; 1024]
        }
    };
    let mut src = format!(
        "/// 外部载荷无效时送出的载荷。\npub static DEFAULT_IPL: [u32; {}] = [\n",
        bytes.len() / 4
    );
    for word in bytes.chunks_exact(4) {
        let word = u32::from_be_bytes([word[0], word[1], word[2], word[3]]);
        writeln!(src, "    {word:#010x},").unwrap();
    }
    src.push_str("];\n");
    src
}
