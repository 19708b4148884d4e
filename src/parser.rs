use crate::mpls::{Clip, Header, Mpls, PlayItem, PlayList, TimeStamp};
use nom::{
    bytes::complete::take,
    combinator::{map, map_res},
    do_parse,
    error::ErrorKind,
    multi::{count, length_value},
    number::complete::{be_u16, be_u32},
    sequence::tuple,
    take, Err, IResult,
};

fn str_len(len: usize, input: &[u8]) -> IResult<&[u8], &str> {
    map_res(take(len), std::str::from_utf8)(input)
}

// matches the ASCII/UTF-8 string "MPLS"
fn header_tag(input: &[u8]) -> IResult<&[u8], &str> {
    let (rest, s) = str_len(4, input)?;
    if s == "MPLS" {
        Ok((rest, s))
    } else {
        Err(Err::Error((input, ErrorKind::Tag)))
    }
}

fn version(input: &[u8]) -> IResult<&[u8], &str> {
    str_len(4, input)
}

fn addr(input: &[u8]) -> IResult<&[u8], u32> {
    be_u32(input)
}

fn clip_file_name(input: &[u8]) -> IResult<&[u8], &str> {
    str_len(5, input)
}

fn clip_codec_id(input: &[u8]) -> IResult<&[u8], &str> {
    str_len(4, input)
}

fn is_multi_angle(input: &[u8]) -> IResult<&[u8], bool> {
    let (input, b) = be_u16(input)?;
    // 0000 0000 000X .... <-- connection_condition
    // |-reserved -|^---- the bit we want
    let is_multi_angle = ((b & 0x1F) >> 4) == 1;
    Ok((input, is_multi_angle))
}

fn time_stamp(input: &[u8]) -> IResult<&[u8], TimeStamp> {
    map(be_u32, TimeStamp)(input)
}

fn play_item_clip(input: &[u8]) -> IResult<&[u8], Clip> {
    let (input, (f, c)) = tuple((clip_file_name, clip_codec_id))(input)?;
    Ok((
        input,
        Clip {
            file_name: f.into(),
            codec_id: c.into(),
        },
    ))
}

fn header(input: &[u8]) -> IResult<&[u8], Header> {
    do_parse!(
        input,
        header_tag
            >> version: version
            >> play_list_start: addr
            >> play_list_mark_start: addr
            >> extension_data_start: addr
            >> take!(20usize) // reserved
            >> (Header {
                version: version.into(),
                play_list_start,
                play_list_mark_start,
                extension_data_start
            })
    )
}

// Only the leading fields of a play item are decoded. The UO mask, still
// mode, angle entries and the stream number table follow the out time and
// are skipped by the item's length prefix.
fn play_item(input: &[u8]) -> IResult<&[u8], PlayItem> {
    fn parser(input: &[u8]) -> IResult<&[u8], PlayItem> {
        do_parse!(
            input,
            clip: play_item_clip >>
            is_multi_angle: is_multi_angle >>
            // RefToSTCID
            take!(1usize) >>
            in_time: time_stamp >>
            out_time: time_stamp >>
            (PlayItem {
                clip,
                is_multi_angle,
                in_time,
                out_time,
            })
        )
    }

    length_value(be_u16, parser)(input)
}

fn play_list(input: &[u8]) -> IResult<&[u8], PlayList> {
    fn parser(input: &[u8]) -> IResult<&[u8], PlayList> {
        let (input, (_, n_play_items, sub_path_count)) =
            tuple((take(2usize), be_u16, be_u16))(input)?;
        let (input, play_items) = count(play_item, n_play_items as usize)(input)?;
        Ok((
            input,
            PlayList {
                play_items,
                sub_path_count,
            },
        ))
    }

    length_value(be_u32, parser)(input)
}

pub fn parse_mpls(input: &[u8]) -> IResult<&[u8], Mpls> {
    let (_, header) = header(input)?;
    // the header only points at the play list; everything in between
    // (AppInfoPlayList) is irrelevant for timing
    let (rest, _) = take(header.play_list_start as usize)(input)?;
    let (rest, play_list) = play_list(rest)?;
    Ok((rest, Mpls { header, play_list }))
}
