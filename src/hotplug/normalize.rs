//! Partition Suffix Normalization
//!
//! Recovers the whole-disk name from a partition device path.

/// Remove a partition suffix from the last segment of a device path.
///
/// Three suffix forms are recognized, in order:
///
/// 1. `-partN` anywhere after the start of the name (`ata-XYZ-part1`)
/// 2. `pN` when the `p` follows a digit (`md0p1`, `nvme0n1p2`)
/// 3. `N` after a scsi, ide, virtio or xen disk name, i.e. a name matching
///    `^([hsv]|xv)d[a-z]+` (`sda1`, `xvdb3`)
///
/// `N` is a non-empty run of digits reaching the end of the name. The
/// directory portion is never touched, and paths that match none of the forms
/// come back unchanged.
pub fn strip_partition(path: &str) -> &str {
    let base = path.rfind('/').map_or(0, |i| i + 1);
    let name = &path[base..];
    let bytes = name.as_bytes();

    let (cut, digits_from) = if let Some(i) = name.find("-part").filter(|&i| i != 0) {
        (i, i + "-part".len())
    } else if let Some(i) = name
        .rfind('p')
        .filter(|&i| i > 1 && bytes[i - 1].is_ascii_digit())
    {
        (i, i + 1)
    } else if matches!(bytes.first(), Some(b'h' | b's' | b'v')) && bytes.get(1) == Some(&b'd') {
        match alpha_run_end(bytes, 2) {
            Some(end) => (end, end),
            None => return path,
        }
    } else if name.starts_with("xvd") {
        match alpha_run_end(bytes, 3) {
            Some(end) => (end, end),
            None => return path,
        }
    } else {
        return path;
    };

    let suffix = &bytes[digits_from..];
    if !suffix.is_empty() && suffix.iter().all(u8::is_ascii_digit) {
        &path[..base + cut]
    } else {
        path
    }
}

/// End of a non-empty ASCII letter run starting at `start`
fn alpha_run_end(bytes: &[u8], start: usize) -> Option<usize> {
    let len = bytes[start..]
        .iter()
        .take_while(|b| b.is_ascii_alphabetic())
        .count();
    (len > 0).then_some(start + len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_part_suffix() {
        assert_eq!(strip_partition("/dev/sda-part3"), "/dev/sda");
        assert_eq!(
            strip_partition("/dev/disk/by-id/ata-SAMSUNG_HD204UI_S2HGJD2Z805891-part1"),
            "/dev/disk/by-id/ata-SAMSUNG_HD204UI_S2HGJD2Z805891"
        );
        // "-part" must be followed by digits only
        assert_eq!(
            strip_partition("/dev/disk/by-id/wwn-0x5000-partition"),
            "/dev/disk/by-id/wwn-0x5000-partition"
        );
    }

    #[test]
    fn test_strip_p_suffix() {
        assert_eq!(strip_partition("/dev/md0p1"), "/dev/md0");
        assert_eq!(strip_partition("/dev/nvme0n1p12"), "/dev/nvme0n1");
        // 'p' not preceded by a digit
        assert_eq!(strip_partition("/dev/loop0"), "/dev/loop0");
        // nothing after the 'p'
        assert_eq!(strip_partition("/dev/md0p"), "/dev/md0p");
    }

    #[test]
    fn test_strip_bus_prefix_digits() {
        assert_eq!(strip_partition("/dev/sda1"), "/dev/sda");
        assert_eq!(strip_partition("/dev/hdb12"), "/dev/hdb");
        assert_eq!(strip_partition("/dev/vdc3"), "/dev/vdc");
        assert_eq!(strip_partition("/dev/xvda1"), "/dev/xvda");
        assert_eq!(strip_partition("/dev/sdaa9"), "/dev/sdaa");
        assert_eq!(strip_partition("/dev/sdp1"), "/dev/sdp");
    }

    #[test]
    fn test_identity_cases() {
        assert_eq!(strip_partition("/dev/sdb"), "/dev/sdb");
        assert_eq!(strip_partition("/dev/sd1"), "/dev/sd1");
        assert_eq!(strip_partition("/dev/dm-0"), "/dev/dm-0");
        assert_eq!(strip_partition("/dev/sdb1x"), "/dev/sdb1x");
        assert_eq!(strip_partition("/dev/-part1"), "/dev/-part1");
    }

    #[test]
    fn test_directory_untouched() {
        // Suffix-looking directory names are never stripped
        assert_eq!(strip_partition("/dev/sda1/disk"), "/dev/sda1/disk");
        assert_eq!(strip_partition("/tmp/md0p1/sdc2"), "/tmp/md0p1/sdc");
    }
}
