use crate::ResourceSet;

#[test]
fn test_absent_resource_has_zero_quantity() {
    let set = ResourceSet::from([("CPU", 4.0)]);
    assert_eq!(set.get("GPU"), None);
    assert_eq!(set.quantity("GPU"), 0.0);
    assert_eq!(set.quantity("CPU"), 4.0);
}

#[test]
fn test_fractional_quantities_cancel_out() {
    let mut set = ResourceSet::from([("CPU", 1.0)]);
    for _ in 0..10 {
        let q = set.quantity("CPU");
        set.set("CPU", q - 0.1);
    }
    for _ in 0..10 {
        let q = set.quantity("CPU");
        set.set("CPU", q + 0.1);
    }
    assert_eq!(set.quantity("CPU"), 1.0);
}

#[test]
fn test_subset() {
    let have = ResourceSet::from([("CPU", 4.0), ("memory", 1024.0)]);
    assert!(ResourceSet::from([("CPU", 4.0)]).is_subset_of(&have));
    assert!(!ResourceSet::from([("CPU", 4.5)]).is_subset_of(&have));
    assert!(!ResourceSet::from([("GPU", 0.0)]).is_subset_of(&have));
    assert!(ResourceSet::new().is_subset_of(&have));
}

#[test]
fn test_clamp_to_cap() {
    let cap = ResourceSet::from([("CPU", 4.0), ("GPU", 1.0)]);
    let mut set = ResourceSet::from([("CPU", 6.0), ("GPU", 0.5), ("TPU", 2.0)]);
    set.clamp_to(&cap);
    assert_eq!(set, ResourceSet::from([("CPU", 4.0), ("GPU", 0.5)]));
}

#[test]
fn test_clamp_to_floors_at_zero() {
    let cap = ResourceSet::from([("CPU", 4.0), ("GPU", 1.0)]);
    let mut set = ResourceSet::from([("CPU", -3.0), ("GPU", f64::NAN)]);
    set.clamp_to(&cap);
    assert_eq!(set, ResourceSet::from([("CPU", 0.0), ("GPU", 0.0)]));
}

#[test]
fn test_invalid_quantities() {
    assert!(!ResourceSet::from([("CPU", 0.0)]).has_invalid_quantity());
    assert!(ResourceSet::from([("CPU", -1.0)]).has_invalid_quantity());
    assert!(ResourceSet::from([("CPU", f64::NAN)]).has_invalid_quantity());
}

#[test]
fn test_display_is_ordered() {
    let set = ResourceSet::from([("memory", 2.0), ("CPU", 1.5)]);
    assert_eq!(set.to_string(), "{CPU: 1.5, memory: 2}");
}
