//! EXIF tag ids consumed by the forensic layers
//!
//! Deliberately not a full tag dictionary: only the tags a validation rule
//! or response field actually reads. Unknown tags still count toward EXIF
//! richness via the parsed entry count.

pub const TAG_MAKE: u16 = 0x010F;
pub const TAG_MODEL: u16 = 0x0110;
pub const TAG_ORIENTATION: u16 = 0x0112;
pub const TAG_SOFTWARE: u16 = 0x0131;
pub const TAG_DATETIME: u16 = 0x0132;
pub const TAG_ARTIST: u16 = 0x013B;
pub const TAG_COPYRIGHT: u16 = 0x8298;
pub const TAG_EXPOSURE_TIME: u16 = 0x829A;
pub const TAG_F_NUMBER: u16 = 0x829D;
pub const TAG_ISO: u16 = 0x8827;
pub const TAG_DATETIME_ORIGINAL: u16 = 0x9003;
pub const TAG_DATETIME_DIGITIZED: u16 = 0x9004;
pub const TAG_APERTURE_VALUE: u16 = 0x9202;
pub const TAG_FOCAL_LENGTH: u16 = 0x920A;
pub const TAG_MAKER_NOTE: u16 = 0x927C;
pub const TAG_USER_COMMENT: u16 = 0x9286;
pub const TAG_PIXEL_X_DIMENSION: u16 = 0xA002;
pub const TAG_PIXEL_Y_DIMENSION: u16 = 0xA003;
pub const TAG_FOCAL_LENGTH_35MM: u16 = 0xA405;
pub const TAG_BODY_SERIAL_NUMBER: u16 = 0xA431;
pub const TAG_LENS_MAKE: u16 = 0xA433;
pub const TAG_LENS_MODEL: u16 = 0xA434;
pub const TAG_LENS_SERIAL_NUMBER: u16 = 0xA435;

/// Sub-IFD pointers.
pub const TAG_EXIF_IFD: u16 = 0x8769;
pub const TAG_GPS_IFD: u16 = 0x8825;

/// GPS IFD tag ids.
pub const GPS_LATITUDE_REF: u16 = 1;
pub const GPS_LATITUDE: u16 = 2;
pub const GPS_LONGITUDE_REF: u16 = 3;
pub const GPS_LONGITUDE: u16 = 4;
pub const GPS_ALTITUDE_REF: u16 = 5;
pub const GPS_ALTITUDE: u16 = 6;
pub const GPS_TIMESTAMP: u16 = 7;
pub const GPS_DATESTAMP: u16 = 29;

pub fn tag_name(tag: u16) -> Option<&'static str> {
    Some(match tag {
        TAG_MAKE => "Make",
        TAG_MODEL => "Model",
        TAG_ORIENTATION => "Orientation",
        TAG_SOFTWARE => "Software",
        TAG_DATETIME => "DateTime",
        TAG_ARTIST => "Artist",
        TAG_COPYRIGHT => "Copyright",
        TAG_EXPOSURE_TIME => "ExposureTime",
        TAG_F_NUMBER => "FNumber",
        TAG_ISO => "ISOSpeedRatings",
        TAG_DATETIME_ORIGINAL => "DateTimeOriginal",
        TAG_DATETIME_DIGITIZED => "DateTimeDigitized",
        TAG_APERTURE_VALUE => "ApertureValue",
        TAG_FOCAL_LENGTH => "FocalLength",
        TAG_MAKER_NOTE => "MakerNote",
        TAG_USER_COMMENT => "UserComment",
        TAG_PIXEL_X_DIMENSION => "PixelXDimension",
        TAG_PIXEL_Y_DIMENSION => "PixelYDimension",
        TAG_FOCAL_LENGTH_35MM => "FocalLengthIn35mmFilm",
        TAG_BODY_SERIAL_NUMBER => "SerialNumber",
        TAG_LENS_MAKE => "LensMake",
        TAG_LENS_MODEL => "LensModel",
        TAG_LENS_SERIAL_NUMBER => "LensSerialNumber",
        _ => return None,
    })
}

pub fn gps_tag_name(tag: u16) -> Option<&'static str> {
    Some(match tag {
        GPS_LATITUDE_REF => "GPSLatitudeRef",
        GPS_LATITUDE => "GPSLatitude",
        GPS_LONGITUDE_REF => "GPSLongitudeRef",
        GPS_LONGITUDE => "GPSLongitude",
        GPS_ALTITUDE_REF => "GPSAltitudeRef",
        GPS_ALTITUDE => "GPSAltitude",
        GPS_TIMESTAMP => "GPSTimeStamp",
        GPS_DATESTAMP => "GPSDateStamp",
        _ => return None,
    })
}
