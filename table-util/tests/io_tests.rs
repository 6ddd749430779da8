use table_util::common_io::create_temp_dir_file;
use table_util::f32_matrix::F32Matrix;
use table_util::sorted_map::SortedTopicMap;
use table_util::triplet_io::*;
use table_util::u32_matrix::U32Matrix;

#[test]
fn u32_triplet_round_trip() -> anyhow::Result<()> {
    let mut m = U32Matrix::new(4, 3);
    m.set(0, 0, 5);
    m.set(1, 2, 17);
    m.set(3, 1, 1);

    let file = create_temp_dir_file(".wt")?;
    let file = file.to_str().unwrap();
    write_u32_triplets(&m, file)?;

    let loaded = read_u32_triplets(file)?;
    assert_eq!(loaded, m);
    Ok(())
}

#[test]
fn u32_triplet_round_trip_gz() -> anyhow::Result<()> {
    let mut m = U32Matrix::new(2, 2);
    m.set(1, 0, 9);

    let file = create_temp_dir_file(".wt.gz")?;
    let file = file.to_str().unwrap();
    write_u32_triplets(&m, file)?;

    let loaded = read_u32_triplets(file)?;
    assert_eq!(loaded, m);
    Ok(())
}

#[test]
fn f32_triplet_round_trip() -> anyhow::Result<()> {
    let mut m = F32Matrix::new(3, 4);
    m.set(0, 1, 0.125);
    m.set(2, 3, 3.0e-7);
    m.set(1, 0, 0.999_999_9);

    let file = create_temp_dir_file(".phi")?;
    let file = file.to_str().unwrap();
    write_f32_triplets(&m, file)?;

    let loaded = read_f32_triplets(file)?;
    assert_eq!(loaded.shape(), (3, 4));
    for r in 0..3 {
        for c in 0..4 {
            assert_eq!(loaded.get(r, c), m.get(r, c), "mismatch at ({}, {})", r, c);
        }
    }
    Ok(())
}

#[test]
fn topic_map_round_trip() -> anyhow::Result<()> {
    let mut map = SortedTopicMap::new(10);
    map.incr(0, 3, 7);
    map.incr(0, 1, 2);
    map.incr(2, 9, 4);
    map.incr(5, 0, 1);

    let file = create_temp_dir_file(".wt")?;
    let file = file.to_str().unwrap();
    write_topic_map(&map, file)?;

    let loaded = read_topic_map(file, 10)?;
    assert_eq!(loaded.max_word_id(), 5);
    assert_eq!(loaded.max_topic_id(), 9);
    for w in [0u32, 1, 2, 5] {
        let want: Vec<(u32, u32)> = map.iter_word(w).collect();
        let got: Vec<(u32, u32)> = loaded.iter_word(w).collect();
        assert_eq!(got, want, "entries differ for word {}", w);
    }
    Ok(())
}

#[test]
fn empty_topic_map_round_trip() -> anyhow::Result<()> {
    let map = SortedTopicMap::new(8);
    let file = create_temp_dir_file(".wt")?;
    let file = file.to_str().unwrap();
    write_topic_map(&map, file)?;

    let loaded = read_topic_map(file, 8)?;
    assert!(loaded.is_empty());
    Ok(())
}

#[test]
fn malformed_data_rows_are_skipped() -> anyhow::Result<()> {
    let file = create_temp_dir_file(".wt")?;
    let file = file.to_str().unwrap();
    std::fs::write(
        file,
        "3,3\n0,0,4\nnot,a,row\n1,1\n2,2,1\n9,9,5\n",
    )?;

    let m = read_u32_triplets(file)?;
    assert_eq!(m.get(0, 0), 4);
    assert_eq!(m.get(2, 2), 1);
    // skipped: bad value, wrong arity, out-of-bounds indices
    assert_eq!(m.get(1, 1), 0);
    Ok(())
}

#[test]
fn out_of_range_topic_rows_are_skipped() -> anyhow::Result<()> {
    let file = create_temp_dir_file(".wt")?;
    let file = file.to_str().unwrap();
    std::fs::write(file, "2,10\n0,3,7\n1,12,5\n")?;

    let map = read_topic_map(file, 10)?;
    assert_eq!(map.get(0, 0), (3, 7));
    // topic 12 exceeds the configured topic count
    assert_eq!(map.num_topics(1), 0);
    Ok(())
}

#[test]
fn bad_header_is_fatal() -> anyhow::Result<()> {
    let file = create_temp_dir_file(".wt")?;
    let file = file.to_str().unwrap();
    std::fs::write(file, "garbage\n0,0,4\n")?;

    assert!(read_u32_triplets(file).is_err());
    Ok(())
}
