//! Tag tables for the three IFDs the codec decodes and writes.
//!
//! Names follow the ImageIO property dictionaries so that a container decoded
//! here looks like the one a platform image API would hand out. Tags that are
//! not listed are still decoded, under their hex id (`0x9C9B`).

use super::container::{EXIF_GROUP, GPS_GROUP, TIFF_GROUP};

/// TIFF field types (TIFF 6.0 §2, EXIF 2.32 §4.6.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Byte = 1,
    Ascii = 2,
    Short = 3,
    Long = 4,
    Rational = 5,
    SByte = 6,
    Undefined = 7,
    SShort = 8,
    SLong = 9,
    SRational = 10,
    Float = 11,
    Double = 12,
}

impl Format {
    pub fn from_u16(code: u16) -> Option<Self> {
        Some(match code {
            1 => Self::Byte,
            2 => Self::Ascii,
            3 => Self::Short,
            4 => Self::Long,
            5 => Self::Rational,
            6 => Self::SByte,
            7 => Self::Undefined,
            8 => Self::SShort,
            9 => Self::SLong,
            10 => Self::SRational,
            11 => Self::Float,
            12 => Self::Double,
            _ => return None,
        })
    }

    /// Size in bytes of one component.
    pub fn size(self) -> usize {
        match self {
            Self::Byte | Self::Ascii | Self::SByte | Self::Undefined => 1,
            Self::Short | Self::SShort => 2,
            Self::Long | Self::SLong | Self::Float => 4,
            Self::Rational | Self::SRational | Self::Double => 8,
        }
    }
}

/// Which IFD a group lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IfdKind {
    Primary,
    Exif,
    Gps,
}

impl IfdKind {
    pub const ALL: [IfdKind; 3] = [IfdKind::Primary, IfdKind::Exif, IfdKind::Gps];

    pub fn group_name(self) -> &'static str {
        match self {
            Self::Primary => TIFF_GROUP,
            Self::Exif => EXIF_GROUP,
            Self::Gps => GPS_GROUP,
        }
    }

    pub fn from_group_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.group_name() == name)
    }

    fn table(self) -> &'static [TagDef] {
        match self {
            Self::Primary => TIFF_TAGS,
            Self::Exif => EXIF_TAGS,
            Self::Gps => GPS_TAGS,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TagDef {
    pub id: u16,
    pub name: &'static str,
    pub format: Format,
}

const fn def(id: u16, name: &'static str, format: Format) -> TagDef {
    TagDef { id, name, format }
}

// Sub-IFD pointers
pub const TAG_EXIF_IFD: u16 = 0x8769;
pub const TAG_GPS_IFD: u16 = 0x8825;
pub const TAG_INTEROP_IFD: u16 = 0xA005;

// GPS
pub const TAG_GPS_LATITUDE: u16 = 0x0002;
pub const TAG_GPS_LONGITUDE: u16 = 0x0004;
pub const TAG_GPS_DEST_LATITUDE: u16 = 0x0014;
pub const TAG_GPS_DEST_LONGITUDE: u16 = 0x0016;

pub const TAG_USER_COMMENT: u16 = 0x9286;

/// Tags that locate other structures in the file. They are never exposed in
/// the container and always survive a rewrite unchanged (apart from sub-IFD
/// pointers, which follow their IFD when it moves).
pub fn is_structural(tag: u16) -> bool {
    matches!(
        tag,
        TAG_EXIF_IFD
            | TAG_GPS_IFD
            | TAG_INTEROP_IFD
            | 0x0111 // StripOffsets
            | 0x0117 // StripByteCounts
            | 0x0144 // TileOffsets
            | 0x0145 // TileByteCounts
            | 0x0201 // JPEGInterchangeFormat
            | 0x0202 // JPEGInterchangeFormatLength
    )
}

/// Whether a GPS tag holds degrees/minutes/seconds that surface as one decimal.
pub fn is_gps_coordinate(kind: IfdKind, tag: u16) -> bool {
    kind == IfdKind::Gps
        && matches!(
            tag,
            TAG_GPS_LATITUDE | TAG_GPS_LONGITUDE | TAG_GPS_DEST_LATITUDE | TAG_GPS_DEST_LONGITUDE
        )
}

/// Container name for a tag id.
pub fn tag_name(kind: IfdKind, id: u16) -> String {
    kind.table()
        .iter()
        .find(|d| d.id == id)
        .map(|d| d.name.to_string())
        .unwrap_or_else(|| format!("0x{id:04X}"))
}

/// Resolve a container name back to its definition, or to a bare id for
/// `0xNNNN` names. `None` means the name is unknown.
pub fn lookup(kind: IfdKind, name: &str) -> Option<(u16, Option<Format>)> {
    if let Some(d) = kind.table().iter().find(|d| d.name == name) {
        return Some((d.id, Some(d.format)));
    }
    let hex = name.strip_prefix("0x").or_else(|| name.strip_prefix("0X"))?;
    let id = u16::from_str_radix(hex, 16).ok()?;
    let format = kind.table().iter().find(|d| d.id == id).map(|d| d.format);
    Some((id, format))
}

use Format::*;

static TIFF_TAGS: &[TagDef] = &[
    def(0x0100, "ImageWidth", Long),
    def(0x0101, "ImageLength", Long),
    def(0x0102, "BitsPerSample", Short),
    def(0x0103, "Compression", Short),
    def(0x0106, "PhotometricInterpretation", Short),
    def(0x010E, "ImageDescription", Ascii),
    def(0x010F, "Make", Ascii),
    def(0x0110, "Model", Ascii),
    def(0x0112, "Orientation", Short),
    def(0x0115, "SamplesPerPixel", Short),
    def(0x0116, "RowsPerStrip", Long),
    def(0x011A, "XResolution", Rational),
    def(0x011B, "YResolution", Rational),
    def(0x011C, "PlanarConfiguration", Short),
    def(0x0128, "ResolutionUnit", Short),
    def(0x012D, "TransferFunction", Short),
    def(0x0131, "Software", Ascii),
    def(0x0132, "DateTime", Ascii),
    def(0x013B, "Artist", Ascii),
    def(0x013C, "HostComputer", Ascii),
    def(0x013E, "WhitePoint", Rational),
    def(0x013F, "PrimaryChromaticities", Rational),
    def(0x0211, "YCbCrCoefficients", Rational),
    def(0x0212, "YCbCrSubSampling", Short),
    def(0x0213, "YCbCrPositioning", Short),
    def(0x0214, "ReferenceBlackWhite", Rational),
    def(0x8298, "Copyright", Ascii),
    def(0x9C9B, "XPTitle", Byte),
    def(0x9C9C, "XPComment", Byte),
    def(0x9C9D, "XPAuthor", Byte),
    def(0x9C9E, "XPKeywords", Byte),
    def(0x9C9F, "XPSubject", Byte),
];

static EXIF_TAGS: &[TagDef] = &[
    def(0x829A, "ExposureTime", Rational),
    def(0x829D, "FNumber", Rational),
    def(0x8822, "ExposureProgram", Short),
    def(0x8824, "SpectralSensitivity", Ascii),
    def(0x8827, "ISOSpeedRatings", Short),
    def(0x8830, "SensitivityType", Short),
    def(0x8832, "RecommendedExposureIndex", Long),
    def(0x9000, "ExifVersion", Undefined),
    def(0x9003, "DateTimeOriginal", Ascii),
    def(0x9004, "DateTimeDigitized", Ascii),
    def(0x9010, "OffsetTime", Ascii),
    def(0x9011, "OffsetTimeOriginal", Ascii),
    def(0x9012, "OffsetTimeDigitized", Ascii),
    def(0x9101, "ComponentsConfiguration", Undefined),
    def(0x9102, "CompressedBitsPerPixel", Rational),
    def(0x9201, "ShutterSpeedValue", SRational),
    def(0x9202, "ApertureValue", Rational),
    def(0x9203, "BrightnessValue", SRational),
    def(0x9204, "ExposureBiasValue", SRational),
    def(0x9205, "MaxApertureValue", Rational),
    def(0x9206, "SubjectDistance", Rational),
    def(0x9207, "MeteringMode", Short),
    def(0x9208, "LightSource", Short),
    def(0x9209, "Flash", Short),
    def(0x920A, "FocalLength", Rational),
    def(0x9214, "SubjectArea", Short),
    def(0x927C, "MakerNote", Undefined),
    def(TAG_USER_COMMENT, "UserComment", Undefined),
    def(0x9290, "SubsecTime", Ascii),
    def(0x9291, "SubsecTimeOriginal", Ascii),
    def(0x9292, "SubsecTimeDigitized", Ascii),
    def(0xA000, "FlashPixVersion", Undefined),
    def(0xA001, "ColorSpace", Short),
    def(0xA002, "PixelXDimension", Long),
    def(0xA003, "PixelYDimension", Long),
    def(0xA20E, "FocalPlaneXResolution", Rational),
    def(0xA20F, "FocalPlaneYResolution", Rational),
    def(0xA210, "FocalPlaneResolutionUnit", Short),
    def(0xA217, "SensingMethod", Short),
    def(0xA300, "FileSource", Undefined),
    def(0xA301, "SceneType", Undefined),
    def(0xA401, "CustomRendered", Short),
    def(0xA402, "ExposureMode", Short),
    def(0xA403, "WhiteBalance", Short),
    def(0xA404, "DigitalZoomRatio", Rational),
    def(0xA405, "FocalLenIn35mmFilm", Short),
    def(0xA406, "SceneCaptureType", Short),
    def(0xA407, "GainControl", Short),
    def(0xA408, "Contrast", Short),
    def(0xA409, "Saturation", Short),
    def(0xA40A, "Sharpness", Short),
    def(0xA40C, "SubjectDistRange", Short),
    def(0xA420, "ImageUniqueID", Ascii),
    def(0xA430, "CameraOwnerName", Ascii),
    def(0xA431, "BodySerialNumber", Ascii),
    def(0xA432, "LensSpecification", Rational),
    def(0xA433, "LensMake", Ascii),
    def(0xA434, "LensModel", Ascii),
    def(0xA435, "LensSerialNumber", Ascii),
];

static GPS_TAGS: &[TagDef] = &[
    def(0x0000, "GPSVersion", Byte),
    def(0x0001, "LatitudeRef", Ascii),
    def(TAG_GPS_LATITUDE, "Latitude", Rational),
    def(0x0003, "LongitudeRef", Ascii),
    def(TAG_GPS_LONGITUDE, "Longitude", Rational),
    def(0x0005, "AltitudeRef", Byte),
    def(0x0006, "Altitude", Rational),
    def(0x0007, "TimeStamp", Rational),
    def(0x0008, "Satellites", Ascii),
    def(0x0009, "Status", Ascii),
    def(0x000A, "MeasureMode", Ascii),
    def(0x000B, "DOP", Rational),
    def(0x000C, "SpeedRef", Ascii),
    def(0x000D, "Speed", Rational),
    def(0x000E, "TrackRef", Ascii),
    def(0x000F, "Track", Rational),
    def(0x0010, "ImgDirectionRef", Ascii),
    def(0x0011, "ImgDirection", Rational),
    def(0x0012, "MapDatum", Ascii),
    def(0x0013, "DestLatitudeRef", Ascii),
    def(TAG_GPS_DEST_LATITUDE, "DestLatitude", Rational),
    def(0x0015, "DestLongitudeRef", Ascii),
    def(TAG_GPS_DEST_LONGITUDE, "DestLongitude", Rational),
    def(0x0017, "DestBearingRef", Ascii),
    def(0x0018, "DestBearing", Rational),
    def(0x0019, "DestDistanceRef", Ascii),
    def(0x001A, "DestDistance", Rational),
    def(0x001B, "ProcessingMethod", Undefined),
    def(0x001C, "AreaInformation", Undefined),
    def(0x001D, "DateStamp", Ascii),
    def(0x001E, "Differential", Short),
    def(0x001F, "HPositioningError", Rational),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_names_round_trip() {
        assert_eq!(tag_name(IfdKind::Exif, 0x9003), "DateTimeOriginal");
        assert_eq!(lookup(IfdKind::Exif, "DateTimeOriginal"), Some((0x9003, Some(Ascii))));
        assert_eq!(tag_name(IfdKind::Gps, 0x001F), "HPositioningError");
        assert_eq!(lookup(IfdKind::Gps, "HPositioningError"), Some((0x001F, Some(Rational))));
    }

    #[test]
    fn unknown_tags_use_hex_names() {
        assert_eq!(tag_name(IfdKind::Exif, 0xBEEF), "0xBEEF");
        assert_eq!(lookup(IfdKind::Exif, "0xBEEF"), Some((0xBEEF, None)));
        // hex spelling of a known tag still picks up its format
        assert_eq!(lookup(IfdKind::Primary, "0x010F"), Some((0x010F, Some(Ascii))));
        assert_eq!(lookup(IfdKind::Exif, "NoSuchTag"), None);
    }

    #[test]
    fn same_id_differs_per_ifd() {
        // 0x0002 is GPS Latitude but means nothing in the Exif IFD
        assert_eq!(tag_name(IfdKind::Gps, 0x0002), "Latitude");
        assert_eq!(tag_name(IfdKind::Exif, 0x0002), "0x0002");
    }

    #[test]
    fn groups_map_to_ifds() {
        assert_eq!(IfdKind::from_group_name("{GPS}"), Some(IfdKind::Gps));
        assert_eq!(IfdKind::from_group_name("{MakerApple}"), None);
    }

    #[test]
    fn structural_tags() {
        assert!(is_structural(TAG_EXIF_IFD));
        assert!(is_structural(0x0111));
        assert!(!is_structural(0x010F));
    }
}
