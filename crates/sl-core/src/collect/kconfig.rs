//! Parsers for kernel configuration text and modprobe.d directives.

use std::collections::BTreeMap;

use sl_common::KernelConfigOption;

/// Parse kernel config content (`CONFIG_NAME=value` lines) from
/// /proc/config.gz output or a /boot/config-* file. Comments and
/// `# CONFIG_FOO is not set` lines are skipped.
pub fn parse_config_content(raw: &str) -> BTreeMap<String, KernelConfigOption> {
    let mut options = BTreeMap::new();
    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((name, value)) = line.split_once('=') else {
            continue;
        };
        let name = name.trim();
        let value = value.trim().trim_matches('"');
        options.insert(
            name.to_string(),
            KernelConfigOption::new(name, value, ""),
        );
    }
    options
}

/// Parse one /etc/modprobe.d/*.conf file into pseudo-options:
/// `options <mod> <args>` becomes `MODPROBE_<MOD>` with the argument list
/// as value, and `blacklist <mod>` becomes `MODPROBE_BLACKLIST_<MOD>=y`.
pub fn parse_modprobe_conf(raw: &str) -> BTreeMap<String, KernelConfigOption> {
    let mut options = BTreeMap::new();
    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("options ") {
            let mut parts = rest.splitn(2, ' ');
            let (Some(module), Some(args)) = (parts.next(), parts.next()) else {
                continue;
            };
            let name = format!("MODPROBE_{}", module.to_uppercase());
            options.insert(
                name.clone(),
                KernelConfigOption::new(
                    name,
                    args.trim(),
                    format!("Modprobe options for {module} module"),
                ),
            );
        } else if let Some(module) = line.strip_prefix("blacklist ") {
            let module = module.trim();
            if module.is_empty() {
                continue;
            }
            let name = format!("MODPROBE_BLACKLIST_{}", module.to_uppercase());
            options.insert(
                name.clone(),
                KernelConfigOption::new(name, "y", format!("Blacklist for {module} module")),
            );
        }
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_content() {
        let raw = "\
#
# Automatically generated file; DO NOT EDIT.
#
CONFIG_HARDENED_USERCOPY=y
CONFIG_HZ=1000
# CONFIG_KASAN is not set
CONFIG_LOCALVERSION=\"-generic\"
";
        let options = parse_config_content(raw);
        assert_eq!(options["CONFIG_HARDENED_USERCOPY"].value, "y");
        assert_eq!(options["CONFIG_HZ"].value, "1000");
        assert_eq!(options["CONFIG_LOCALVERSION"].value, "-generic");
        assert!(!options.contains_key("CONFIG_KASAN"));
    }

    #[test]
    fn test_parse_modprobe_conf() {
        let raw = "\
# audio fix
options snd-hda-intel model=generic power_save=1
blacklist nouveau
blacklist pcspkr
";
        let options = parse_modprobe_conf(raw);
        assert_eq!(
            options["MODPROBE_SND-HDA-INTEL"].value,
            "model=generic power_save=1"
        );
        assert_eq!(options["MODPROBE_BLACKLIST_NOUVEAU"].value, "y");
        assert_eq!(options["MODPROBE_BLACKLIST_PCSPKR"].value, "y");
        assert_eq!(options.len(), 3);
    }
}
