fn node_platform(os: &str) -> &str {
    match os {
        "macos" => "darwin",
        "windows" => "win32",
        other => other,
    }
}

fn node_arch(arch: &str) -> &str {
    match arch {
        "x86_64" => "x64",
        "x86" => "ia32",
        "aarch64" => "arm64",
        "powerpc64" => "ppc64",
        other => other,
    }
}

/// Platform segment of the update feed URL, e.g. `linux_x64` or `mac`.
pub(crate) fn platform_tag_for(os: &str, arch: &str) -> String {
    let tag = format!("{}_{}", node_platform(os), node_arch(arch));
    if tag == "darwin_x64" {
        "mac".to_string()
    } else {
        tag
    }
}

pub(crate) fn current_platform_tag() -> String {
    platform_tag_for(std::env::consts::OS, std::env::consts::ARCH)
}

#[cfg(test)]
mod tests {
    use super::platform_tag_for;

    #[test]
    fn intel_mac_is_special_cased() {
        assert_eq!(platform_tag_for("macos", "x86_64"), "mac");
    }

    #[test]
    fn maps_rust_names_to_node_names() {
        assert_eq!(platform_tag_for("macos", "aarch64"), "darwin_arm64");
        assert_eq!(platform_tag_for("linux", "x86_64"), "linux_x64");
        assert_eq!(platform_tag_for("windows", "x86"), "win32_ia32");
        assert_eq!(platform_tag_for("windows", "x86_64"), "win32_x64");
    }

    #[test]
    fn unknown_names_pass_through() {
        assert_eq!(platform_tag_for("freebsd", "riscv64"), "freebsd_riscv64");
    }
}
