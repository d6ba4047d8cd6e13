use genomic_data::common_io::*;

#[test]
fn gzipped_lines_of_words() -> anyhow::Result<()> {
    let file = create_temp_dir_file("txt.gz")?;
    let file = file.to_str().expect("utf8 path");

    let lines: Vec<Box<str>> = vec![
        "#comment".into(),
        "a\tb\tc".into(),
        "".into(),
        "d\te f\tg".into(),
    ];
    write_lines(&lines, file)?;

    let out = read_lines_of_words_delim(file, &['\t'], -1)?;
    assert!(out.header.is_empty());
    assert_eq!(out.lines.len(), 2);
    assert_eq!(out.lines[1][1].as_ref(), "e f");
    Ok(())
}

#[test]
fn header_line() -> anyhow::Result<()> {
    let file = create_temp_dir_file("tsv")?;
    let file = file.to_str().expect("utf8 path");

    let lines: Vec<Box<str>> = vec!["x,y".into(), "1,2".into(), "3,4".into()];
    write_lines(&lines, file)?;

    let out = read_lines_of_words_delim(file, ",", 0)?;
    assert_eq!(out.header, vec![Box::<str>::from("x"), Box::from("y")]);
    assert_eq!(out.lines.len(), 2);

    assert!(read_lines_of_words_delim(file, ",", 5).is_err());
    Ok(())
}

#[test]
fn file_name_helpers() {
    assert_eq!(strip_extension("a/b.gtf.gz").as_ref(), "a/b.gtf");
    assert_eq!(strip_extension("noext").as_ref(), "noext");
    assert!(mkdir("plain_name.bed").is_ok());
}
